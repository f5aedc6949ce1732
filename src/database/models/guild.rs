//! Guild model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::schema::{
    COLUMN_CREATED_AT, COLUMN_UPDATED_AT, Column, ColumnType, Entity, Index, Schema,
};

pub const COLUMN_GUILD_ID: &str = "guild_id";
pub const COLUMN_NAME: &str = "name";

static SCHEMA: Schema = Schema {
    table: "guilds",
    columns: &[
        Column::id(),
        Column::new(COLUMN_CREATED_AT, ColumnType::Timestamp),
        Column::new(COLUMN_UPDATED_AT, ColumnType::Timestamp),
        Column::new(COLUMN_GUILD_ID, ColumnType::BigInt),
        Column::new(COLUMN_NAME, ColumnType::Text),
    ],
    indexes: &[Index::unique("idx_guilds_guild_id", &[COLUMN_GUILD_ID])],
};

/// A Discord guild the bot is currently on.
///
/// The name is only stored for convenience when searching the
/// database by hand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Guild {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,

    /// Platform snowflake.
    pub guild_id: u64,
    pub name: String,
}

impl Guild {
    pub fn new(guild_id: u64, name: impl Into<String>) -> Self {
        Self {
            guild_id,
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Entity for Guild {
    fn schema() -> &'static Schema {
        &SCHEMA
    }

    fn id(&self) -> i64 {
        self.id
    }
}
