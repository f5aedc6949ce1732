//! SQL store backend over sqlx's `Any` driver (SQLite or PostgreSQL).

use async_trait::async_trait;
use serde_json::Value;
use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::query::Query as SqlQuery;
use sqlx::{Any, AnyPool, Row as _};
use tracing::{debug, info};

use super::query::Query;
use super::schema::{COLUMN_ID, COLUMN_UPDATED_AT, Column, ColumnType, Schema};
use super::store::{Row, Store, StoreError, StoreResult};
use crate::config::DatabaseMode;

/// SQL flavour, decides DDL types and placeholder syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl From<DatabaseMode> for Dialect {
    fn from(mode: DatabaseMode) -> Self {
        match mode {
            DatabaseMode::Sqlite => Self::Sqlite,
            DatabaseMode::Postgres => Self::Postgres,
        }
    }
}

impl Dialect {
    /// Placeholder for the `n`-th (1-based) bound parameter.
    fn placeholder(self, n: usize) -> String {
        match self {
            Self::Sqlite => "?".to_string(),
            Self::Postgres => format!("${n}"),
        }
    }

    fn column_type(self, kind: ColumnType) -> &'static str {
        match (self, kind) {
            (Self::Sqlite, ColumnType::Id) => "INTEGER PRIMARY KEY AUTOINCREMENT",
            (Self::Postgres, ColumnType::Id) => "BIGSERIAL PRIMARY KEY",
            (_, ColumnType::BigInt) => "BIGINT",
            (_, ColumnType::Text | ColumnType::Timestamp) => "TEXT",
            // The Any driver cannot decode SQLite's BOOLEAN affinity.
            (Self::Sqlite, ColumnType::Boolean) => "INTEGER",
            (Self::Postgres, ColumnType::Boolean) => "BOOLEAN",
        }
    }

    /// `CREATE TABLE` followed by one statement per index.
    pub fn create_statements(self, schema: &Schema) -> Vec<String> {
        let columns: Vec<String> = schema
            .columns
            .iter()
            .map(|column| {
                let mut definition = format!("{} {}", column.name, self.column_type(column.kind));
                if column.kind != ColumnType::Id && !column.nullable {
                    definition.push_str(" NOT NULL");
                }
                if let Some(parent) = column.references {
                    definition.push_str(&format!(" REFERENCES {parent}(id) ON DELETE CASCADE"));
                }
                definition
            })
            .collect();

        let mut statements = vec![format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            schema.table,
            columns.join(", ")
        )];

        for index in schema.indexes {
            statements.push(format!(
                "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
                if index.unique { "UNIQUE " } else { "" },
                index.name,
                schema.table,
                index.columns.join(", ")
            ));
        }

        statements
    }
}

/// Store backed by a sqlx connection pool.
pub struct SqlStore {
    pool: AnyPool,
    dialect: Dialect,
}

impl SqlStore {
    /// Connect to the database at `url`.
    pub async fn connect(url: &str, mode: DatabaseMode) -> StoreResult<Self> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new().max_connections(5).connect(url).await?;
        info!("Connected to {:?} database", mode);

        Ok(Self {
            pool,
            dialect: mode.into(),
        })
    }

    fn where_clause(&self, query: &Query, first: usize) -> String {
        if query.filters.is_empty() {
            return String::new();
        }

        let predicates: Vec<String> = query
            .filters
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{} = {}", f.column, self.dialect.placeholder(first + i)))
            .collect();

        format!(" WHERE {}", predicates.join(" AND "))
    }

    fn bind_filters<'q>(
        &self,
        mut sql: SqlQuery<'q, Any, AnyArguments<'q>>,
        query: &Query,
    ) -> StoreResult<SqlQuery<'q, Any, AnyArguments<'q>>> {
        for filter in &query.filters {
            let column = lookup(query.schema, filter.column)?;
            sql = bind(sql, self.dialect, column, &filter.value)?;
        }
        Ok(sql)
    }
}

#[async_trait]
impl Store for SqlStore {
    async fn register_entity(&self, schema: &'static Schema) -> StoreResult<()> {
        for statement in self.dialect.create_statements(schema) {
            debug!("Migrating: {}", statement);
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn insert(&self, schema: &'static Schema, row: Row) -> StoreResult<i64> {
        let columns = row_columns(schema, &row)?;
        let placeholders: Vec<String> = (1..=columns.len())
            .map(|n| self.dialect.placeholder(n))
            .collect();

        let statement = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING id",
            schema.table,
            columns.iter().map(|c| c.name).collect::<Vec<_>>().join(", "),
            placeholders.join(", ")
        );

        let mut sql = sqlx::query(&statement);
        for column in &columns {
            sql = bind(sql, self.dialect, column, row.get(column.name).unwrap_or(&Value::Null))?;
        }

        let inserted = sql
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_error(schema, e))?;
        Ok(inserted.try_get::<i64, _>(0)?)
    }

    async fn upsert(&self, schema: &'static Schema, id: i64, row: Row) -> StoreResult<()> {
        let columns = row_columns(schema, &row)?;
        let mut names = vec![COLUMN_ID];
        names.extend(columns.iter().map(|c| c.name));

        let placeholders: Vec<String> = (1..=names.len())
            .map(|n| self.dialect.placeholder(n))
            .collect();
        let updates: Vec<String> = columns
            .iter()
            .map(|c| format!("{0} = excluded.{0}", c.name))
            .collect();

        let statement = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT (id) DO UPDATE SET {}",
            schema.table,
            names.join(", "),
            placeholders.join(", "),
            updates.join(", ")
        );

        let mut sql = sqlx::query(&statement).bind(id);
        for column in &columns {
            sql = bind(sql, self.dialect, column, row.get(column.name).unwrap_or(&Value::Null))?;
        }

        sql.execute(&self.pool)
            .await
            .map_err(|e| map_error(schema, e))?;
        Ok(())
    }

    async fn update_column(
        &self,
        schema: &'static Schema,
        id: i64,
        column: &str,
        value: Value,
    ) -> StoreResult<u64> {
        let target = lookup(schema, column)?;
        let touch = schema.has_column(COLUMN_UPDATED_AT) && column != COLUMN_UPDATED_AT;

        let statement = if touch {
            format!(
                "UPDATE {} SET {} = {}, {} = {} WHERE id = {}",
                schema.table,
                target.name,
                self.dialect.placeholder(1),
                COLUMN_UPDATED_AT,
                self.dialect.placeholder(2),
                self.dialect.placeholder(3)
            )
        } else {
            format!(
                "UPDATE {} SET {} = {} WHERE id = {}",
                schema.table,
                target.name,
                self.dialect.placeholder(1),
                self.dialect.placeholder(2)
            )
        };

        let mut sql = bind(sqlx::query(&statement), self.dialect, target, &value)?;
        if touch {
            sql = sql.bind(chrono::Utc::now().to_rfc3339());
        }

        let result = sql
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_error(schema, e))?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, schema: &'static Schema, id: i64) -> StoreResult<u64> {
        let statement = format!(
            "DELETE FROM {} WHERE id = {}",
            schema.table,
            self.dialect.placeholder(1)
        );

        let result = sqlx::query(&statement)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_error(schema, e))?;
        Ok(result.rows_affected())
    }

    async fn select(&self, query: &Query) -> StoreResult<Vec<Row>> {
        let columns: Vec<&str> = query.schema.columns.iter().map(|c| c.name).collect();
        let mut statement = format!(
            "SELECT {} FROM {}{}",
            columns.join(", "),
            query.schema.table,
            self.where_clause(query, 1)
        );
        if let Some((column, order)) = query.order {
            statement.push_str(&format!(" ORDER BY {} {}", column, order.as_sql()));
        }
        if let Some(limit) = query.limit {
            statement.push_str(&format!(" LIMIT {limit}"));
        }

        let sql = self.bind_filters(sqlx::query(&statement), query)?;
        let rows = sql.fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| decode_row(self.dialect, query.schema, row))
            .collect()
    }

    async fn count(&self, query: &Query) -> StoreResult<i64> {
        let statement = format!(
            "SELECT COUNT(*) FROM {}{}",
            query.schema.table,
            self.where_clause(query, 1)
        );

        let sql = self.bind_filters(sqlx::query(&statement), query)?;
        let row = sql.fetch_one(&self.pool).await?;
        Ok(row.try_get::<i64, _>(0)?)
    }
}

fn lookup<'s>(schema: &'s Schema, column: &str) -> StoreResult<&'s Column> {
    schema.column(column).ok_or_else(|| StoreError::UnknownColumn {
        table: schema.table,
        column: column.to_string(),
    })
}

/// Data columns present in the row, in schema order.
fn row_columns<'s>(schema: &'s Schema, row: &Row) -> StoreResult<Vec<&'s Column>> {
    if let Some(unknown) = row.keys().find(|key| !schema.has_column(key)) {
        return Err(StoreError::UnknownColumn {
            table: schema.table,
            column: unknown.clone(),
        });
    }

    Ok(schema
        .data_columns()
        .filter(|c| row.contains_key(c.name))
        .collect())
}

/// Bind a JSON value with the SQL type of its column; nulls stay typed.
fn bind<'q>(
    sql: SqlQuery<'q, Any, AnyArguments<'q>>,
    dialect: Dialect,
    column: &Column,
    value: &Value,
) -> StoreResult<SqlQuery<'q, Any, AnyArguments<'q>>> {
    Ok(match (column.kind, dialect) {
        (ColumnType::Id | ColumnType::BigInt, _) => sql.bind(integer(column, value)?),
        (ColumnType::Boolean, Dialect::Sqlite) => sql.bind(value.as_bool().map(i64::from)),
        (ColumnType::Boolean, Dialect::Postgres) => sql.bind(value.as_bool()),
        (ColumnType::Text | ColumnType::Timestamp, _) => sql.bind(match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }),
    })
}

/// Integer columns are signed 64-bit on both backends.
fn integer(column: &Column, value: &Value) -> StoreResult<Option<i64>> {
    if let Some(v) = value.as_i64() {
        return Ok(Some(v));
    }
    if let Some(v) = value.as_u64() {
        return i64::try_from(v)
            .map(Some)
            .map_err(|_| StoreError::OutOfRange {
                column: column.name,
                value: v.to_string(),
            });
    }
    Ok(value.as_bool().map(i64::from))
}

fn decode_row(dialect: Dialect, schema: &Schema, row: &AnyRow) -> StoreResult<Row> {
    let mut decoded = Row::new();

    for column in schema.columns {
        let value = match (column.kind, dialect) {
            (ColumnType::Id | ColumnType::BigInt, _) => row
                .try_get::<Option<i64>, _>(column.name)?
                .map_or(Value::Null, Value::from),
            (ColumnType::Text | ColumnType::Timestamp, _) => row
                .try_get::<Option<String>, _>(column.name)?
                .map_or(Value::Null, Value::from),
            (ColumnType::Boolean, Dialect::Sqlite) => row
                .try_get::<Option<i64>, _>(column.name)?
                .map_or(Value::Null, |v| Value::from(v != 0)),
            (ColumnType::Boolean, Dialect::Postgres) => row
                .try_get::<Option<bool>, _>(column.name)?
                .map_or(Value::Null, Value::from),
        };
        decoded.insert(column.name.to_string(), value);
    }

    Ok(decoded)
}

fn map_error(schema: &'static Schema, error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &error {
        if db.is_unique_violation() {
            return StoreError::UniqueViolation {
                table: schema.table,
                detail: db.message().to_string(),
            };
        }
        if db.is_foreign_key_violation() {
            return StoreError::ForeignKeyViolation {
                table: schema.table,
                detail: db.message().to_string(),
            };
        }
    }

    StoreError::Backend(error)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use super::*;
    use crate::cache::CacheRegistry;
    use crate::database::models::component_status::COLUMN_ENABLED;
    use crate::database::models::{
        AuditLogConfig, GlobalComponentStatus, Guild, GuildComponentStatus, RegisteredComponent,
    };
    use crate::database::repository::EntityError;
    use crate::database::schema::Entity;
    use crate::database::{Database, EntityManager};

    /// Fresh SQLite file under the system temp directory.
    async fn sqlite_store() -> (Arc<SqlStore>, std::path::PathBuf) {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("componentbot-{}-{nanos}.db", std::process::id()));
        let url = format!("sqlite://{}?mode=rwc", path.display());

        let store = SqlStore::connect(&url, DatabaseMode::Sqlite).await.unwrap();
        (Arc::new(store), path)
    }

    /// Entity manager with its own (cold) caches over `store`.
    fn entities(store: &Arc<SqlStore>) -> EntityManager {
        let db = Database::new(store.clone());
        EntityManager::new(db, &CacheRegistry::new(), Duration::from_secs(600)).unwrap()
    }

    #[test]
    fn test_sqlite_ddl() {
        let statements = Dialect::Sqlite.create_statements(GuildComponentStatus::schema());

        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS guild_component_statuses"));
        assert!(statements[0].contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(statements[0].contains("guild_id BIGINT NOT NULL REFERENCES guilds(id) ON DELETE CASCADE"));
        assert!(statements.iter().any(|s| s.starts_with("CREATE UNIQUE INDEX")
            && s.ends_with("(guild_id, component_id)")));
    }

    #[test]
    fn test_postgres_placeholders() {
        assert_eq!(Dialect::Postgres.placeholder(3), "$3");
        assert_eq!(Dialect::Sqlite.placeholder(3), "?");
        assert!(Dialect::Postgres
            .create_statements(GuildComponentStatus::schema())[0]
            .contains("id BIGSERIAL PRIMARY KEY"));
    }

    #[test]
    fn test_sqlite_booleans_are_integers() {
        let statements = Dialect::Sqlite.create_statements(GlobalComponentStatus::schema());
        assert!(statements[0].contains("enabled INTEGER NOT NULL"));

        let statements = Dialect::Postgres.create_statements(GlobalComponentStatus::schema());
        assert!(statements[0].contains("enabled BOOLEAN NOT NULL"));
    }

    #[tokio::test]
    async fn test_sqlite_round_trips_boolean_columns() {
        let (store, path) = sqlite_store().await;

        let writer = entities(&store);
        writer.register_default_entities().await.unwrap();

        let mut guild = Guild::new(1061349235456458762, "Guild");
        writer.guilds().create(&mut guild).await.unwrap();
        let mut component = RegisteredComponent {
            code: "ping_pong".into(),
            name: "Ping Pong".into(),
            default_enabled: true,
            ..Default::default()
        };
        writer.registered_components().create(&mut component).await.unwrap();
        let mut global = GlobalComponentStatus::new(component.id, true);
        writer.global_component_statuses().create(&mut global).await.unwrap();
        let mut local = GuildComponentStatus::new(guild.id, component.id, true);
        writer.guild_component_statuses().create(&mut local).await.unwrap();
        writer
            .guild_component_statuses()
            .update(&mut local, COLUMN_ENABLED, false)
            .await
            .unwrap();
        let mut config = AuditLogConfig {
            guild_id: guild.id,
            channel_id: Some(555),
            enabled: true,
            ..Default::default()
        };
        writer.audit_log_configs().save(&mut config).await.unwrap();

        let reader = entities(&store);
        assert!(reader.registered_components().get("ping_pong").await.unwrap().default_enabled);
        assert!(reader.global_component_statuses().get(component.id).await.unwrap().enabled);
        assert!(
            !reader
                .guild_component_statuses()
                .get(guild.id, component.id)
                .await
                .unwrap()
                .enabled
        );
        let stored = reader.audit_log_configs().get_by_guild_id(guild.id).await.unwrap();
        assert!(stored.enabled);
        assert_eq!(stored.channel_id, Some(555));
        assert_eq!(
            reader.guilds().get("1061349235456458762").await.unwrap().name,
            "Guild"
        );

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_sqlite_rejects_integers_beyond_i64() {
        let (store, path) = sqlite_store().await;
        let entities = entities(&store);
        entities.register_default_entities().await.unwrap();

        let mut guild = Guild::new(u64::MAX, "Too Big");
        let err = entities.guilds().create(&mut guild).await.unwrap_err();

        assert!(matches!(
            err,
            EntityError::Store(StoreError::OutOfRange { column: "guild_id", .. })
        ));
        assert_eq!(entities.guilds().count().await.unwrap(), 0);

        let _ = std::fs::remove_file(path);
    }
}
