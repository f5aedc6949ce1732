//! Table descriptions shared by every store backend.
//!
//! Entities describe their table once as a `static` [`Schema`]; backends
//! derive DDL, column lists and constraint checks from it.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Auto-incremented surrogate key.
    Id,
    BigInt,
    Text,
    Boolean,
    /// RFC 3339 text.
    Timestamp,
}

/// One column of a table.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
    pub nullable: bool,
    /// Referenced table (by `id`). Deleting the parent cascades.
    pub references: Option<&'static str>,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnType) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            references: None,
        }
    }

    pub const fn id() -> Self {
        Self::new("id", ColumnType::Id)
    }

    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub const fn references(mut self, table: &'static str) -> Self {
        self.references = Some(table);
        self
    }
}

/// Secondary index, optionally unique.
#[derive(Debug, Clone, Copy)]
pub struct Index {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub unique: bool,
}

impl Index {
    pub const fn new(name: &'static str, columns: &'static [&'static str]) -> Self {
        Self {
            name,
            columns,
            unique: false,
        }
    }

    pub const fn unique(name: &'static str, columns: &'static [&'static str]) -> Self {
        Self {
            name,
            columns,
            unique: true,
        }
    }
}

/// Full description of a table.
#[derive(Debug)]
pub struct Schema {
    pub table: &'static str,
    pub columns: &'static [Column],
    pub indexes: &'static [Index],
}

impl Schema {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Columns written by inserts (everything but the surrogate key).
    pub fn data_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.kind != ColumnType::Id)
    }
}

/// Column names every entity carries. `id` is always the first column,
/// followed by the two timestamps.
pub const COLUMN_ID: &str = "id";
pub const COLUMN_CREATED_AT: &str = "created_at";
pub const COLUMN_UPDATED_AT: &str = "updated_at";

/// A persisted row type.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Table the entity lives in.
    fn schema() -> &'static Schema;

    /// Surrogate key, `0` while unsaved.
    fn id(&self) -> i64;
}
