//! Component system.
//!
//! A component is an independently loadable unit contributing event
//! handlers and slash commands. Components whose code starts with
//! [`CORE_COMPONENT_PREFIX`] are core components: always enabled and
//! loaded first.

mod component;
mod context;
mod enablement;
mod registry;

pub use component::{Category, Component, LifecycleFn};
pub use context::ComponentContext;
pub use enablement::is_enabled;
pub use registry::ComponentRegistry;

/// Code prefix of components that cannot be toggled.
pub const CORE_COMPONENT_PREFIX: &str = "bot_";

pub fn is_core_code(code: &str) -> bool {
    code.starts_with(CORE_COMPONENT_PREFIX)
}
