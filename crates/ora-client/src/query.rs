//! Statements with bind values.

use ora_types::{SqlValue, ToSql};

/// A SQL statement plus its positional bind values.
///
/// Placeholders use Oracle syntax (`:1`, `:name`); values bind in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    sql: String,
    params: Vec<SqlValue>,
}

impl Query {
    /// Create a new query from SQL text.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Add a bind value.
    #[must_use]
    pub fn bind<T: ToSql + ?Sized>(mut self, value: &T) -> Self {
        self.params.push(value.to_sql());
        self
    }

    /// Replace all bind values.
    #[must_use]
    pub fn with_params(mut self, params: Vec<SqlValue>) -> Self {
        self.params = params;
        self
    }

    /// Get the SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Get the bind values.
    #[must_use]
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }
}

impl From<&str> for Query {
    fn from(sql: &str) -> Self {
        Self::new(sql)
    }
}

impl From<String> for Query {
    fn from(sql: String) -> Self {
        Self::new(sql)
    }
}
