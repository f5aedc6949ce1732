//! In-process store backend.
//!
//! Honors the same contract as the SQL backend (unique indexes, foreign
//! keys with cascade delete, ordering, limits) without a database server.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use super::query::{Order, Query};
use super::schema::{COLUMN_ID, COLUMN_UPDATED_AT, Schema};
use super::store::{Row, Store, StoreError, StoreResult};

struct Table {
    schema: &'static Schema,
    rows: BTreeMap<i64, Row>,
    next_id: i64,
}

/// Store keeping every table in memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<&'static str, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn register_entity(&self, schema: &'static Schema) -> StoreResult<()> {
        self.tables.write().entry(schema.table).or_insert_with(|| Table {
            schema,
            rows: BTreeMap::new(),
            next_id: 1,
        });
        Ok(())
    }

    async fn insert(&self, schema: &'static Schema, row: Row) -> StoreResult<i64> {
        let mut tables = self.tables.write();
        let row = normalize(schema, row)?;

        check_foreign_keys(&tables, schema, &row)?;
        let table = table_mut(&mut tables, schema)?;
        check_unique(table, None, &row)?;

        let id = table.next_id;
        table.next_id += 1;

        let mut row = row;
        row.insert(COLUMN_ID.to_string(), Value::from(id));
        table.rows.insert(id, row);

        Ok(id)
    }

    async fn upsert(&self, schema: &'static Schema, id: i64, row: Row) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let mut row = normalize(schema, row)?;

        check_foreign_keys(&tables, schema, &row)?;
        let table = table_mut(&mut tables, schema)?;
        check_unique(table, Some(id), &row)?;

        row.insert(COLUMN_ID.to_string(), Value::from(id));
        table.rows.insert(id, row);
        table.next_id = table.next_id.max(id + 1);

        Ok(())
    }

    async fn update_column(
        &self,
        schema: &'static Schema,
        id: i64,
        column: &str,
        value: Value,
    ) -> StoreResult<u64> {
        let mut tables = self.tables.write();

        let mut probe = Row::new();
        probe.insert(column.to_string(), value.clone());
        check_foreign_keys(&tables, schema, &probe)?;

        let table = table_mut(&mut tables, schema)?;
        let Some(mut row) = table.rows.get(&id).cloned() else {
            return Ok(0);
        };
        row.insert(column.to_string(), value);
        check_unique(table, Some(id), &row)?;

        if schema.has_column(COLUMN_UPDATED_AT) {
            row.insert(
                COLUMN_UPDATED_AT.to_string(),
                Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        table.rows.insert(id, row);

        Ok(1)
    }

    async fn delete(&self, schema: &'static Schema, id: i64) -> StoreResult<u64> {
        let mut tables = self.tables.write();
        let table = table_mut(&mut tables, schema)?;

        if table.rows.remove(&id).is_none() {
            return Ok(0);
        }
        cascade(&mut tables, schema.table, id);

        Ok(1)
    }

    async fn select(&self, query: &Query) -> StoreResult<Vec<Row>> {
        let tables = self.tables.read();
        let table = tables
            .get(query.schema.table)
            .ok_or(StoreError::UnknownTable(query.schema.table))?;

        let mut rows: Vec<Row> = table
            .rows
            .values()
            .filter(|row| matches(row, query))
            .cloned()
            .collect();

        if let Some((column, order)) = query.order {
            rows.sort_by(|a, b| {
                let ordering = compare(a.get(column), b.get(column));
                match order {
                    Order::Asc => ordering,
                    Order::Desc => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit as usize);
        }

        Ok(rows)
    }

    async fn count(&self, query: &Query) -> StoreResult<i64> {
        let tables = self.tables.read();
        let table = tables
            .get(query.schema.table)
            .ok_or(StoreError::UnknownTable(query.schema.table))?;

        Ok(table.rows.values().filter(|row| matches(row, query)).count() as i64)
    }
}

fn table_mut<'a>(
    tables: &'a mut HashMap<&'static str, Table>,
    schema: &'static Schema,
) -> StoreResult<&'a mut Table> {
    tables
        .get_mut(schema.table)
        .ok_or(StoreError::UnknownTable(schema.table))
}

/// Reject unknown columns and fill absent ones with null.
fn normalize(schema: &'static Schema, mut row: Row) -> StoreResult<Row> {
    if let Some(column) = row.keys().find(|key| !schema.has_column(key)) {
        return Err(StoreError::UnknownColumn {
            table: schema.table,
            column: column.clone(),
        });
    }

    for column in schema.columns {
        if column.name != COLUMN_ID && !row.contains_key(column.name) {
            row.insert(column.name.to_string(), Value::Null);
        }
    }

    Ok(row)
}

fn check_unique(table: &Table, own_id: Option<i64>, row: &Row) -> StoreResult<()> {
    for index in table.schema.indexes.iter().filter(|i| i.unique) {
        let clash = table.rows.iter().any(|(id, existing)| {
            Some(*id) != own_id
                && index
                    .columns
                    .iter()
                    .all(|column| values_equal(existing.get(*column), row.get(*column)))
        });

        if clash {
            return Err(StoreError::UniqueViolation {
                table: table.schema.table,
                detail: format!("duplicate value for index {}", index.name),
            });
        }
    }

    Ok(())
}

fn check_foreign_keys(
    tables: &HashMap<&'static str, Table>,
    schema: &'static Schema,
    row: &Row,
) -> StoreResult<()> {
    for column in schema.columns {
        let (Some(parent), Some(value)) = (column.references, row.get(column.name)) else {
            continue;
        };
        if value.is_null() {
            continue;
        }

        let exists = value
            .as_i64()
            .and_then(|id| tables.get(parent).map(|t| t.rows.contains_key(&id)))
            .unwrap_or(false);

        if !exists {
            return Err(StoreError::ForeignKeyViolation {
                table: schema.table,
                detail: format!("{} references missing {} row {}", column.name, parent, value),
            });
        }
    }

    Ok(())
}

/// Delete every row that references `table.id`, recursively.
fn cascade(tables: &mut HashMap<&'static str, Table>, table: &'static str, id: i64) {
    let mut pending = vec![(table, id)];

    while let Some((parent, parent_id)) = pending.pop() {
        for child in tables.values_mut() {
            let columns: Vec<&str> = child
                .schema
                .columns
                .iter()
                .filter(|c| c.references == Some(parent))
                .map(|c| c.name)
                .collect();
            if columns.is_empty() {
                continue;
            }

            let doomed: Vec<i64> = child
                .rows
                .iter()
                .filter(|(_, row)| {
                    columns
                        .iter()
                        .any(|c| row.get(*c).and_then(Value::as_i64) == Some(parent_id))
                })
                .map(|(id, _)| *id)
                .collect();

            for doomed_id in doomed {
                child.rows.remove(&doomed_id);
                pending.push((child.schema.table, doomed_id));
            }
        }
    }
}

fn matches(row: &Row, query: &Query) -> bool {
    query
        .filters
        .iter()
        .all(|filter| values_equal(row.get(filter.column), Some(&filter.value)))
}

fn values_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => a.as_f64() == b.as_f64(),
        },
        (Some(a), Some(b)) => a == b,
        (None, Some(Value::Null)) | (Some(Value::Null), None) | (None, None) => true,
        _ => false,
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::{Column, ColumnType, Index};
    use serde_json::json;

    static PARENTS: Schema = Schema {
        table: "parents",
        columns: &[Column::id(), Column::new("code", ColumnType::Text)],
        indexes: &[Index::unique("idx_parents_code", &["code"])],
    };

    static CHILDREN: Schema = Schema {
        table: "children",
        columns: &[
            Column::id(),
            Column::new("parent_id", ColumnType::BigInt).references("parents"),
            Column::new("rank", ColumnType::BigInt),
        ],
        indexes: &[],
    };

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    async fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.register_entity(&PARENTS).await.unwrap();
        store.register_entity(&CHILDREN).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_unique_index_rejects_duplicates() {
        let store = store().await;

        store.insert(&PARENTS, row(json!({"code": "a"}))).await.unwrap();
        let err = store.insert(&PARENTS, row(json!({"code": "a"}))).await.unwrap_err();

        assert!(matches!(err, StoreError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_children() {
        let store = store().await;

        let parent = store.insert(&PARENTS, row(json!({"code": "a"}))).await.unwrap();
        store
            .insert(&CHILDREN, row(json!({"parent_id": parent, "rank": 1})))
            .await
            .unwrap();

        assert_eq!(store.delete(&PARENTS, parent).await.unwrap(), 1);
        assert_eq!(store.count(&Query::new(&CHILDREN)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_foreign_key_must_exist() {
        let store = store().await;

        let err = store
            .insert(&CHILDREN, row(json!({"parent_id": 99, "rank": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_select_orders_and_limits() {
        let store = store().await;
        let parent = store.insert(&PARENTS, row(json!({"code": "a"}))).await.unwrap();
        for rank in [3, 1, 2] {
            store
                .insert(&CHILDREN, row(json!({"parent_id": parent, "rank": rank})))
                .await
                .unwrap();
        }

        let query = Query::new(&CHILDREN)
            .filter("parent_id", parent)
            .order_by("rank", Order::Desc)
            .limit(2);
        let ranks: Vec<i64> = store
            .select(&query)
            .await
            .unwrap()
            .iter()
            .filter_map(|r| r.get("rank").and_then(Value::as_i64))
            .collect();

        assert_eq!(ranks, vec![3, 2]);
    }
}
