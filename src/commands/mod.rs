//! Slash-command registry.
//!
//! Components hand their commands to a [`CommandManager`]; the shared
//! [`CommandRegistry`] routes interactions to them and reconciles the
//! platform's application-command catalog with what is registered.

mod command;
mod manager;
mod registry;
mod sync;

use thiserror::Error;

pub use command::{Command, RegisteredCommand};
pub use manager::CommandManager;
pub use registry::{CommandRegistry, CommandSummary};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("slash command /{0} is already registered")]
    AlreadyRegistered(String),

    #[error("the interaction handler is already mounted")]
    AlreadyInitialized,
}
