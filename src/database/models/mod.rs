//! Persisted entity models.

pub mod audit_log;
pub mod component_status;
pub mod guild;
pub mod registered_component;

pub use audit_log::{AuditLog, AuditLogConfig};
pub use component_status::{GlobalComponentStatus, GuildComponentStatus};
pub use guild::Guild;
pub use registered_component::RegisteredComponent;
