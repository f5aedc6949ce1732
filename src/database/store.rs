//! Store capability and the typed `Database` facade over it.
//!
//! Backends only move rows (`serde_json` maps) in and out of tables; the
//! facade converts entities to rows and back and stamps timestamps.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use super::query::{Order, Query};
use super::schema::{COLUMN_CREATED_AT, COLUMN_ID, COLUMN_UPDATED_AT, Entity, Schema};

/// A table row keyed by column name.
pub type Row = Map<String, Value>;

/// Errors raised by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no matching row in {table}")]
    NotFound { table: &'static str },

    #[error("unique constraint violated on {table}: {detail}")]
    UniqueViolation { table: &'static str, detail: String },

    #[error("foreign key constraint violated on {table}: {detail}")]
    ForeignKeyViolation { table: &'static str, detail: String },

    #[error("table {0} is not registered")]
    UnknownTable(&'static str),

    #[error("unknown column {column} on {table}")]
    UnknownColumn { table: &'static str, column: String },

    #[error("value {value} of column {column} does not fit a signed 64-bit integer")]
    OutOfRange { column: &'static str, value: String },

    #[error("row conversion failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Backend(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Row-level persistence operations every backend provides.
#[async_trait]
pub trait Store: Send + Sync {
    /// Create the table and its indexes if they do not exist.
    async fn register_entity(&self, schema: &'static Schema) -> StoreResult<()>;

    /// Insert a row (without `id`), returning the assigned id.
    async fn insert(&self, schema: &'static Schema, row: Row) -> StoreResult<i64>;

    /// Insert or replace the row with the given id.
    async fn upsert(&self, schema: &'static Schema, id: i64, row: Row) -> StoreResult<()>;

    /// Set a single column, returning the number of affected rows.
    async fn update_column(
        &self,
        schema: &'static Schema,
        id: i64,
        column: &str,
        value: Value,
    ) -> StoreResult<u64>;

    /// Delete by id, returning the number of affected rows.
    async fn delete(&self, schema: &'static Schema, id: i64) -> StoreResult<u64>;

    async fn select(&self, query: &Query) -> StoreResult<Vec<Row>>;

    async fn count(&self, query: &Query) -> StoreResult<i64>;
}

/// Typed persistence API used by the repositories.
#[derive(Clone)]
pub struct Database {
    store: Arc<dyn Store>,
}

impl Database {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Migrate the table of an entity kind.
    pub async fn register_entity<T: Entity>(&self) -> StoreResult<()> {
        debug!("Registering entity table {}", T::schema().table);
        self.store.register_entity(T::schema()).await
    }

    /// Persist a new entity and refresh it with the stored values.
    pub async fn create<T: Entity>(&self, entity: &mut T) -> StoreResult<()> {
        let schema = T::schema();
        let mut row = to_row(entity)?;
        let now = timestamp();

        row.remove(COLUMN_ID);
        row.insert(COLUMN_CREATED_AT.to_string(), now.clone());
        row.insert(COLUMN_UPDATED_AT.to_string(), now);

        let id = self.store.insert(schema, row.clone()).await?;
        row.insert(COLUMN_ID.to_string(), Value::from(id));
        *entity = from_row(row)?;

        Ok(())
    }

    /// Upsert: create when unsaved, otherwise replace the stored row.
    pub async fn save<T: Entity>(&self, entity: &mut T) -> StoreResult<()> {
        if entity.id() == 0 {
            return self.create(entity).await;
        }

        let mut row = to_row(entity)?;
        row.remove(COLUMN_ID);
        row.insert(COLUMN_UPDATED_AT.to_string(), timestamp());

        self.store.upsert(T::schema(), entity.id(), row.clone()).await?;
        row.insert(COLUMN_ID.to_string(), Value::from(entity.id()));
        *entity = from_row(row)?;

        Ok(())
    }

    /// Update a single column of a stored entity, mirroring it in memory.
    pub async fn update_column<T: Entity>(
        &self,
        entity: &mut T,
        column: &'static str,
        value: impl Into<Value>,
    ) -> StoreResult<()> {
        let schema = T::schema();
        if !schema.has_column(column) || column == COLUMN_ID {
            return Err(StoreError::UnknownColumn {
                table: schema.table,
                column: column.to_string(),
            });
        }

        let value = value.into();
        let affected = self
            .store
            .update_column(schema, entity.id(), column, value.clone())
            .await?;
        if affected == 0 {
            return Err(StoreError::NotFound {
                table: schema.table,
            });
        }

        let mut row = to_row(entity)?;
        row.insert(column.to_string(), value);
        *entity = from_row(row)?;

        Ok(())
    }

    #[allow(dead_code)]
    pub async fn delete<T: Entity>(&self, entity: &T) -> StoreResult<()> {
        let affected = self.store.delete(T::schema(), entity.id()).await?;
        if affected == 0 {
            return Err(StoreError::NotFound {
                table: T::schema().table,
            });
        }

        Ok(())
    }

    /// First matching row by ascending id.
    pub async fn get_first<T: Entity>(&self, filters: &[(&'static str, Value)]) -> StoreResult<T> {
        self.query::<T>()
            .filters(filters)
            .order_by(COLUMN_ID, Order::Asc)
            .fetch_one()
            .await
    }

    /// Matching row with the highest id.
    #[allow(dead_code)]
    pub async fn get_last<T: Entity>(&self, filters: &[(&'static str, Value)]) -> StoreResult<T> {
        self.query::<T>()
            .filters(filters)
            .order_by(COLUMN_ID, Order::Desc)
            .fetch_one()
            .await
    }

    #[allow(dead_code)]
    pub async fn get_many<T: Entity>(
        &self,
        filters: &[(&'static str, Value)],
    ) -> StoreResult<Vec<T>> {
        self.query::<T>()
            .filters(filters)
            .order_by(COLUMN_ID, Order::Asc)
            .fetch_all()
            .await
    }

    pub async fn count<T: Entity>(&self, filters: &[(&'static str, Value)]) -> StoreResult<i64> {
        self.query::<T>().filters(filters).count().await
    }

    /// Builder for custom selects.
    pub fn query<T: Entity>(&self) -> QueryBuilder<'_, T> {
        QueryBuilder {
            db: self,
            query: Query::new(T::schema()),
            _entity: PhantomData,
        }
    }
}

/// Typed select builder returned by [`Database::query`].
pub struct QueryBuilder<'a, T> {
    db: &'a Database,
    query: Query,
    _entity: PhantomData<T>,
}

impl<T: Entity> QueryBuilder<'_, T> {
    #[must_use]
    pub fn filter(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.query = self.query.filter(column, value);
        self
    }

    #[must_use]
    pub fn filters(mut self, filters: &[(&'static str, Value)]) -> Self {
        for (column, value) in filters {
            self.query = self.query.filter(*column, value.clone());
        }
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: &'static str, order: Order) -> Self {
        self.query = self.query.order_by(column, order);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.query = self.query.limit(limit);
        self
    }

    fn validate(&self) -> StoreResult<()> {
        match self.query.unknown_columns().first() {
            Some(column) => Err(StoreError::UnknownColumn {
                table: self.query.schema.table,
                column: (*column).to_string(),
            }),
            None => Ok(()),
        }
    }

    pub async fn fetch_all(self) -> StoreResult<Vec<T>> {
        self.validate()?;
        let rows = self.db.store.select(&self.query).await?;
        rows.into_iter().map(from_row).collect()
    }

    pub async fn fetch_one(self) -> StoreResult<T> {
        let table = self.query.schema.table;
        self.limit(1)
            .fetch_all()
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound { table })
    }

    pub async fn count(self) -> StoreResult<i64> {
        self.validate()?;
        self.db.store.count(&self.query).await
    }
}

fn to_row<T: Entity>(entity: &T) -> StoreResult<Row> {
    match serde_json::to_value(entity)? {
        Value::Object(row) => Ok(row),
        _ => Err(StoreError::Serialization(serde::ser::Error::custom(format!(
            "{} entities must serialize to an object",
            T::schema().table
        )))),
    }
}

fn from_row<T: Entity>(row: Row) -> StoreResult<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

fn timestamp() -> Value {
    Value::String(Utc::now().to_rfc3339())
}
