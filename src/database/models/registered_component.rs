//! Persisted mirror of a declared component.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::components::is_core_code;
use crate::database::schema::{
    COLUMN_CREATED_AT, COLUMN_UPDATED_AT, Column, ColumnType, Entity, Index, Schema,
};

pub const COLUMN_CODE: &str = "code";
pub const COLUMN_NAME: &str = "name";
pub const COLUMN_DESCRIPTION: &str = "description";
pub const COLUMN_DEFAULT_ENABLED: &str = "default_enabled";

static SCHEMA: Schema = Schema {
    table: "registered_components",
    columns: &[
        Column::id(),
        Column::new(COLUMN_CREATED_AT, ColumnType::Timestamp),
        Column::new(COLUMN_UPDATED_AT, ColumnType::Timestamp),
        Column::new(COLUMN_CODE, ColumnType::Text),
        Column::new(COLUMN_NAME, ColumnType::Text),
        Column::new(COLUMN_DESCRIPTION, ColumnType::Text),
        Column::new(COLUMN_DEFAULT_ENABLED, ColumnType::Boolean),
    ],
    indexes: &[Index::unique("idx_registered_components_code", &[COLUMN_CODE])],
};

/// A component known to the database.
///
/// Rows outlive the binary that created them, so a row may describe a
/// component the running build no longer ships.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisteredComponent {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,

    pub code: String,
    pub name: String,
    pub description: String,
    pub default_enabled: bool,
}

impl RegisteredComponent {
    /// Core components cannot be toggled.
    pub fn is_core(&self) -> bool {
        is_core_code(&self.code)
    }
}

impl Entity for RegisteredComponent {
    fn schema() -> &'static Schema {
        &SCHEMA
    }

    fn id(&self) -> i64 {
        self.id
    }
}
