//! Global and per-guild component enablement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::schema::{
    COLUMN_CREATED_AT, COLUMN_UPDATED_AT, Column, ColumnType, Entity, Index, Schema,
};

pub const COLUMN_COMPONENT_ID: &str = "component_id";
pub const COLUMN_GUILD_ID: &str = "guild_id";
pub const COLUMN_ENABLED: &str = "enabled";

static GLOBAL_SCHEMA: Schema = Schema {
    table: "global_component_statuses",
    columns: &[
        Column::id(),
        Column::new(COLUMN_CREATED_AT, ColumnType::Timestamp),
        Column::new(COLUMN_UPDATED_AT, ColumnType::Timestamp),
        Column::new(COLUMN_COMPONENT_ID, ColumnType::BigInt).references("registered_components"),
        Column::new(COLUMN_ENABLED, ColumnType::Boolean),
    ],
    indexes: &[Index::unique(
        "idx_global_component_statuses_component_id",
        &[COLUMN_COMPONENT_ID],
    )],
};

static GUILD_SCHEMA: Schema = Schema {
    table: "guild_component_statuses",
    columns: &[
        Column::id(),
        Column::new(COLUMN_CREATED_AT, ColumnType::Timestamp),
        Column::new(COLUMN_UPDATED_AT, ColumnType::Timestamp),
        Column::new(COLUMN_GUILD_ID, ColumnType::BigInt).references("guilds"),
        Column::new(COLUMN_COMPONENT_ID, ColumnType::BigInt).references("registered_components"),
        Column::new(COLUMN_ENABLED, ColumnType::Boolean),
    ],
    indexes: &[Index::unique(
        "idx_guild_component_statuses_guild_id_component_id",
        &[COLUMN_GUILD_ID, COLUMN_COMPONENT_ID],
    )],
};

/// Bot-wide switch for a component, one row per registered component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalComponentStatus {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,

    /// `registered_components.id`
    pub component_id: i64,
    pub enabled: bool,
}

impl GlobalComponentStatus {
    pub fn new(component_id: i64, enabled: bool) -> Self {
        Self {
            component_id,
            enabled,
            ..Default::default()
        }
    }
}

impl Entity for GlobalComponentStatus {
    fn schema() -> &'static Schema {
        &GLOBAL_SCHEMA
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// Enablement of a non-core component on one guild.
///
/// A missing row means the component was never enabled there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuildComponentStatus {
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
    pub enabled: bool,
}

impl GuildComponentStatus {
    pub fn new(guild_id: i64, component_id: i64, enabled: bool) -> Self {
        Self {
            guild_id,
            component_id,
            enabled,
            ..Default::default()
        }
    }
}

impl Entity for GuildComponentStatus {
    fn schema() -> &'static Schema {
        &GUILD_SCHEMA
    }

    fn id(&self) -> i64 {
        self.id
    }
}
