//! Bot audit log entries and their per-guild configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::schema::{
    COLUMN_CREATED_AT, COLUMN_UPDATED_AT, Column, ColumnType, Entity, Index, Schema,
};

pub const COLUMN_GUILD_ID: &str = "guild_id";
pub const COLUMN_COMPONENT_ID: &str = "component_id";
pub const COLUMN_USER_ID: &str = "user_id";
pub const COLUMN_MESSAGE: &str = "message";
pub const COLUMN_CHANNEL_ID: &str = "channel_id";
pub const COLUMN_ENABLED: &str = "enabled";

static LOG_SCHEMA: Schema = Schema {
    table: "audit_logs",
    columns: &[
        Column::id(),
        Column::new(COLUMN_CREATED_AT, ColumnType::Timestamp),
        Column::new(COLUMN_UPDATED_AT, ColumnType::Timestamp),
        Column::new(COLUMN_GUILD_ID, ColumnType::BigInt).references("guilds"),
        Column::new(COLUMN_COMPONENT_ID, ColumnType::BigInt).references("registered_components"),
        Column::new(COLUMN_USER_ID, ColumnType::BigInt),
        Column::new(COLUMN_MESSAGE, ColumnType::Text),
    ],
    indexes: &[
        Index::new("idx_audit_logs_guild_id", &[COLUMN_GUILD_ID]),
        Index::new("idx_audit_logs_user_id", &[COLUMN_USER_ID]),
        Index::new(
            "idx_audit_logs_guild_id_component_id_user_id",
            &[COLUMN_GUILD_ID, COLUMN_COMPONENT_ID, COLUMN_USER_ID],
        ),
    ],
};

static CONFIG_SCHEMA: Schema = Schema {
    table: "audit_log_configs",
    columns: &[
        Column::id(),
        Column::new(COLUMN_CREATED_AT, ColumnType::Timestamp),
        Column::new(COLUMN_UPDATED_AT, ColumnType::Timestamp),
        Column::new(COLUMN_GUILD_ID, ColumnType::BigInt).references("guilds"),
        Column::new(COLUMN_CHANNEL_ID, ColumnType::BigInt).nullable(),
        Column::new(COLUMN_ENABLED, ColumnType::Boolean),
    ],
    indexes: &[Index::unique("idx_audit_log_configs_guild_id", &[COLUMN_GUILD_ID])],
};

/// A bot-initiated action, append-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,

    /// `guilds.id`
    pub guild_id: i64,
    /// `registered_components.id`
    pub component_id: i64,
    /// Platform id of the acting user.
    pub user_id: u64,
    pub message: String,
}

impl Entity for AuditLog {
    fn schema() -> &'static Schema {
        &LOG_SCHEMA
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// Where (and whether) audit log entries of a guild are announced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditLogConfig {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,

    /// `guilds.id`
    pub guild_id: i64,
    #[serde(default)]
    pub channel_id: Option<u64>,
    pub enabled: bool,
}

impl Entity for AuditLogConfig {
    fn schema() -> &'static Schema {
        &CONFIG_SCHEMA
    }

    fn id(&self) -> i64 {
        self.id
    }
}
