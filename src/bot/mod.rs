//! Bot module - Core bot functionality.

mod audit;
pub mod dispatcher;
mod runtime;
mod status;

pub use audit::AuditLogger;
pub use dispatcher::AppState;
#[cfg(test)]
pub use dispatcher::testing;
pub use runtime::run;
pub use status::StatusRotator;
