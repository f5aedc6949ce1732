//! Event handler dispatcher.
//!
//! Components register handlers through their [`HandlerManager`]. Each
//! registration composes, outermost first:
//!
//! 1. the once wrapper (`register_once`), which retires the handler
//! 2. the message matcher (message variants)
//! 3. the status gate, which drops events of disabled components
//! 4. the decorators, first added runs first
//! 5. the callback
//!
//! and binds the result to the platform session under a process-wide
//! unique qualified name.

mod handler;
mod manager;
mod matcher;

use thiserror::Error;

pub use handler::HandlerTable;
pub use manager::HandlerManager;
pub use matcher::MessageMatcher;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("event handler {0} is already registered")]
    AlreadyRegistered(String),

    #[error("no event handler named {0}")]
    NotFound(String),

    #[error("invalid message pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
