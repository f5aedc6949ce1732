//! Filtered selects shared by every backend.

use serde_json::Value;

use super::schema::Schema;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Equality predicate on one column.
#[derive(Debug, Clone)]
pub struct Filter {
    pub column: &'static str,
    pub value: Value,
}

/// Select description: all filters are AND-ed together.
#[derive(Debug, Clone)]
pub struct Query {
    pub schema: &'static Schema,
    pub filters: Vec<Filter>,
    pub order: Option<(&'static str, Order)>,
    pub limit: Option<u32>,
}

impl Query {
    pub fn new(schema: &'static Schema) -> Self {
        Self {
            schema,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn filter(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column,
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: &'static str, order: Order) -> Self {
        self.order = Some((column, order));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Column names used by filters and ordering that the table lacks.
    pub fn unknown_columns(&self) -> Vec<&'static str> {
        self.filters
            .iter()
            .map(|f| f.column)
            .chain(self.order.map(|(column, _)| column))
            .filter(|column| !self.schema.has_column(column))
            .collect()
    }
}
