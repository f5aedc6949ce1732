//! Components shipped with the binary.
//!
//! Add new plugins by:
//! 1. Creating a new file in this directory
//! 2. Adding `pub mod your_plugin;` below
//! 3. Declaring the component in `register_all()`

pub mod bot_core;
pub mod bot_log;
pub mod bot_status;
pub mod ping_pong;
pub mod statistics;

use crate::components::ComponentRegistry;

/// Declare every shipped component. Load order is decided by the registry.
pub fn register_all(registry: &ComponentRegistry) {
    registry.register(bot_core::component(), bot_core::load);
    registry.register(bot_log::component(), bot_log::load);
    registry.register(bot_status::component(), bot_status::load);
    registry.register(ping_pong::component(), ping_pong::load);
    registry.register(statistics::component(), statistics::load);
}
