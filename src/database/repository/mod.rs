//! Repository module - entity-specific data access with a cache in front.
//!
//! Every repository reads through its own typed cache and invalidates the
//! affected key on writes. [`EntityManager`] owns one repository per
//! entity kind.

mod audit_log_repository;
mod component_status_repository;
mod guild_repository;
mod registered_component_repository;

use std::time::Duration;

use thiserror::Error;
use tracing::info;

pub use audit_log_repository::{AuditLogConfigRepository, AuditLogRepository};
pub use component_status_repository::{
    GLOBAL_STATUS_DISABLED_DISPLAY, GLOBAL_STATUS_ENABLED_DISPLAY, GUILD_STATUS_DISABLED_DISPLAY,
    GlobalComponentStatusRepository, GuildComponentStatusRepository,
};
pub use guild_repository::GuildRepository;
pub use registered_component_repository::RegisteredComponentRepository;

use crate::cache::{CacheError, CacheRegistry};
use crate::database::models::{
    AuditLog, AuditLogConfig, GlobalComponentStatus, Guild, GuildComponentStatus,
    RegisteredComponent,
};
use crate::database::{Database, StoreError, StoreResult};

/// Errors surfaced by repositories.
#[derive(Debug, Error)]
pub enum EntityError {
    #[error("no {0} entity found")]
    NotFound(&'static str),

    #[error("invalid platform identifier {0:?}")]
    InvalidIdentifier(String),

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error(transparent)]
    Store(StoreError),
}

impl EntityError {
    /// A missing row usually means "create it now".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<StoreError> for EntityError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { table } => Self::NotFound(table),
            StoreError::UniqueViolation { table, detail } => {
                Self::UniqueViolation(format!("{table}: {detail}"))
            }
            other => Self::Store(other),
        }
    }
}

pub type EntityResult<T> = Result<T, EntityError>;

/// Parse a platform snowflake given as decimal string.
pub fn parse_snowflake(raw: &str) -> EntityResult<u64> {
    raw.trim()
        .parse()
        .map_err(|_| EntityError::InvalidIdentifier(raw.to_string()))
}

/// Owner of all entity-specific repositories.
pub struct EntityManager {
    db: Database,
    guilds: GuildRepository,
    registered_components: RegisteredComponentRepository,
    global_component_statuses: GlobalComponentStatusRepository,
    guild_component_statuses: GuildComponentStatusRepository,
    audit_log_configs: AuditLogConfigRepository,
    audit_logs: AuditLogRepository,
}

impl EntityManager {
    /// Build the repositories. `ttl` is the lifetime of cached rows,
    /// zero keeps them until invalidated.
    pub fn new(db: Database, cache: &CacheRegistry, ttl: Duration) -> Result<Self, CacheError> {
        Ok(Self {
            guilds: GuildRepository::new(&db, cache, ttl)?,
            registered_components: RegisteredComponentRepository::new(&db, cache, ttl)?,
            global_component_statuses: GlobalComponentStatusRepository::new(&db, cache, ttl)?,
            guild_component_statuses: GuildComponentStatusRepository::new(&db, cache, ttl)?,
            audit_log_configs: AuditLogConfigRepository::new(&db, cache, ttl)?,
            audit_logs: AuditLogRepository::new(&db),
            db,
        })
    }

    /// Create all tables, parents before children.
    pub async fn register_default_entities(&self) -> StoreResult<()> {
        self.db.register_entity::<Guild>().await?;
        self.db.register_entity::<RegisteredComponent>().await?;
        self.db.register_entity::<GlobalComponentStatus>().await?;
        self.db.register_entity::<GuildComponentStatus>().await?;
        self.db.register_entity::<AuditLogConfig>().await?;
        self.db.register_entity::<AuditLog>().await?;

        info!("Database schema is up to date");
        Ok(())
    }

    /// Raw typed store access for custom queries.
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn guilds(&self) -> &GuildRepository {
        &self.guilds
    }

    pub fn registered_components(&self) -> &RegisteredComponentRepository {
        &self.registered_components
    }

    pub fn global_component_statuses(&self) -> &GlobalComponentStatusRepository {
        &self.global_component_statuses
    }

    pub fn guild_component_statuses(&self) -> &GuildComponentStatusRepository {
        &self.guild_component_statuses
    }

    pub fn audit_log_configs(&self) -> &AuditLogConfigRepository {
        &self.audit_log_configs
    }

    pub fn audit_logs(&self) -> &AuditLogRepository {
        &self.audit_logs
    }
}
