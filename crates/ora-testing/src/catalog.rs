//! A mutable, in-memory data dictionary served through [`MockDriver`].
//!
//! [`MockCatalog::install`] answers the `ALL_USERS`, `ALL_TABLES`,
//! `ALL_TAB_COLUMNS` and `ALL_CONSTRAINTS` queries issued by the metadata
//! introspection layer. Binds are positional: `:1` is the owner, `:2` (when
//! present) the table name. Changes made after installation are visible to
//! the next query, which makes the catalog usable for invalidation tests.

use std::sync::Arc;

use ora_client::SqlValue;
use parking_lot::Mutex;

use crate::mock::{MockDriver, MockResponse};

/// A column in [`MockTable`].
#[derive(Debug, Clone)]
pub struct MockColumn {
    name: String,
    data_type: String,
    data_length: i64,
    char_length: i64,
    char_used: Option<&'static str>,
    precision: Option<i64>,
    scale: Option<i64>,
    nullable: bool,
    default: Option<String>,
}

impl MockColumn {
    /// A nullable column of `data_type` (`NUMBER`, `VARCHAR2`, `DATE`, ...).
    pub fn new(name: &str, data_type: &str) -> Self {
        let data_length = match data_type {
            "DATE" => 7,
            "NUMBER" => 22,
            _ => 0,
        };
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            data_length,
            char_length: 0,
            char_used: None,
            precision: None,
            scale: None,
            nullable: true,
            default: None,
        }
    }

    /// A `VARCHAR2(length BYTE)` column.
    pub fn varchar2(name: &str, length: i64) -> Self {
        let mut column = Self::new(name, "VARCHAR2");
        column.data_length = length;
        column.char_length = length;
        column.char_used = Some("B");
        column
    }

    /// A `NUMBER(precision, scale)` column.
    pub fn number(name: &str, precision: i64, scale: i64) -> Self {
        let mut column = Self::new(name, "NUMBER");
        column.precision = Some(precision);
        column.scale = Some(scale);
        column
    }

    /// Use character length semantics.
    #[must_use]
    pub fn char_semantics(mut self) -> Self {
        self.char_used = Some("C");
        self
    }

    /// Mark the column `NOT NULL`.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Set the default expression.
    #[must_use]
    pub fn default_expr(mut self, expr: &str) -> Self {
        self.default = Some(expr.to_string());
        self
    }
}

/// A constraint in [`MockTable`].
#[derive(Debug, Clone)]
pub struct MockConstraint {
    name: String,
    kind: &'static str,
    columns: Vec<String>,
    search_condition: Option<String>,
    generated: bool,
    referenced: Option<(String, String, Vec<String>)>,
    delete_rule: Option<&'static str>,
}

impl MockConstraint {
    fn new(name: &str, kind: &'static str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind,
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            search_condition: None,
            generated: false,
            referenced: None,
            delete_rule: None,
        }
    }

    /// A primary key.
    pub fn primary_key(name: &str, columns: &[&str]) -> Self {
        Self::new(name, "P", columns)
    }

    /// A unique constraint.
    pub fn unique(name: &str, columns: &[&str]) -> Self {
        Self::new(name, "U", columns)
    }

    /// A foreign key referencing `owner.table(referenced)`.
    pub fn foreign_key(
        name: &str,
        columns: &[&str],
        owner: &str,
        table: &str,
        referenced: &[&str],
    ) -> Self {
        let mut constraint = Self::new(name, "R", columns);
        constraint.referenced = Some((
            owner.to_string(),
            table.to_string(),
            referenced.iter().map(|c| (*c).to_string()).collect(),
        ));
        constraint.delete_rule = Some("NO ACTION");
        constraint
    }

    /// A user-defined check constraint.
    pub fn check(name: &str, condition: &str) -> Self {
        let mut constraint = Self::new(name, "C", &[]);
        constraint.search_condition = Some(condition.to_string());
        constraint
    }

    /// The system-generated check Oracle creates for a `NOT NULL` column.
    pub fn system_not_null(name: &str, column: &str) -> Self {
        let mut constraint = Self::new(name, "C", &[column]);
        constraint.search_condition = Some(format!("\"{column}\" IS NOT NULL"));
        constraint.generated = true;
        constraint
    }

    /// Set the foreign key delete rule (`CASCADE`, `SET NULL`, `NO ACTION`).
    #[must_use]
    pub fn on_delete(mut self, rule: &'static str) -> Self {
        self.delete_rule = Some(rule);
        self
    }
}

/// A table in [`MockCatalog`].
#[derive(Debug, Clone)]
pub struct MockTable {
    owner: String,
    name: String,
    columns: Vec<MockColumn>,
    constraints: Vec<MockConstraint>,
}

impl MockTable {
    /// An empty table `owner.name`.
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            columns: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Append a column; its `COLUMN_ID` is its position.
    #[must_use]
    pub fn column(mut self, column: MockColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Add a constraint.
    #[must_use]
    pub fn constraint(mut self, constraint: MockConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Append a column to an existing table.
    pub fn add_column(&mut self, column: MockColumn) {
        self.columns.push(column);
    }

    /// Drop a column by name; later columns move up one position.
    pub fn drop_column(&mut self, name: &str) {
        self.columns.retain(|c| c.name != name);
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    users: Vec<String>,
    tables: Vec<MockTable>,
}

impl CatalogState {
    fn has_user(&self, owner: &str) -> bool {
        self.users.iter().any(|u| u == owner) || self.tables.iter().any(|t| t.owner == owner)
    }

    fn tables<'a>(&'a self, params: &'a [SqlValue]) -> impl Iterator<Item = &'a MockTable> + 'a {
        let owner = params.first().and_then(SqlValue::as_str);
        let table = params.get(1).and_then(SqlValue::as_str);
        self.tables.iter().filter(move |t| {
            owner.is_none_or(|o| t.owner == o) && table.is_none_or(|n| t.name == n)
        })
    }
}

/// A shared, mutable fake data dictionary.
#[derive(Debug, Clone, Default)]
pub struct MockCatalog {
    state: Arc<Mutex<CatalogState>>,
}

fn text(value: &str) -> SqlValue {
    SqlValue::String(value.to_string())
}

fn opt_text(value: Option<&str>) -> SqlValue {
    value.map_or(SqlValue::Null, text)
}

fn opt_int(value: Option<i64>) -> SqlValue {
    value.map_or(SqlValue::Null, SqlValue::Int)
}

impl MockCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema that owns no tables.
    pub fn add_user(&self, name: &str) {
        self.state.lock().users.push(name.to_string());
    }

    /// Add (or replace) a table.
    pub fn add_table(&self, table: MockTable) {
        let mut state = self.state.lock();
        state
            .tables
            .retain(|t| !(t.owner == table.owner && t.name == table.name));
        state.tables.push(table);
    }

    /// Modify a table in place. Returns `false` if it does not exist.
    pub fn alter_table(&self, owner: &str, name: &str, f: impl FnOnce(&mut MockTable)) -> bool {
        let mut state = self.state.lock();
        match state
            .tables
            .iter_mut()
            .find(|t| t.owner == owner && t.name == name)
        {
            Some(table) => {
                f(table);
                true
            }
            None => false,
        }
    }

    /// Drop a table.
    pub fn drop_table(&self, owner: &str, name: &str) {
        self.state
            .lock()
            .tables
            .retain(|t| !(t.owner == owner && t.name == name));
    }

    /// Serve the catalog views from `driver`.
    pub fn install(&self, driver: &MockDriver) {
        let catalog = self.clone();
        driver.on_query("FROM ALL_USERS", move |_, params| catalog.users(params));
        let catalog = self.clone();
        driver.on_query("FROM ALL_TABLES", move |_, params| catalog.table_names(params));
        let catalog = self.clone();
        driver.on_query("FROM ALL_TAB_COLUMNS", move |_, params| catalog.columns(params));
        let catalog = self.clone();
        driver.on_query("FROM ALL_CONSTRAINTS", move |_, params| {
            catalog.constraints(params)
        });
    }

    fn users(&self, params: &[SqlValue]) -> MockResponse {
        let state = self.state.lock();
        let rows = params
            .first()
            .and_then(SqlValue::as_str)
            .filter(|owner| state.has_user(owner))
            .map(|owner| vec![vec![text(owner)]])
            .unwrap_or_default();
        MockResponse::rows(&["USERNAME"], rows)
    }

    fn table_names(&self, params: &[SqlValue]) -> MockResponse {
        let state = self.state.lock();
        let mut names: Vec<&str> = state.tables(params).map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        let rows = names.into_iter().map(|n| vec![text(n)]).collect();
        MockResponse::rows(&["TABLE_NAME"], rows)
    }

    fn columns(&self, params: &[SqlValue]) -> MockResponse {
        let state = self.state.lock();
        let mut tables: Vec<&MockTable> = state.tables(params).collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));

        let mut rows = Vec::new();
        for table in tables {
            for (index, column) in table.columns.iter().enumerate() {
                rows.push(vec![
                    text(&table.name),
                    text(&column.name),
                    text(&column.data_type),
                    SqlValue::Int(column.data_length),
                    SqlValue::Int(column.char_length),
                    opt_text(column.char_used),
                    opt_int(column.precision),
                    opt_int(column.scale),
                    text(if column.nullable { "Y" } else { "N" }),
                    opt_text(column.default.as_deref()),
                    SqlValue::Int(index as i64 + 1),
                ]);
            }
        }

        MockResponse::rows(
            &[
                "TABLE_NAME",
                "COLUMN_NAME",
                "DATA_TYPE",
                "DATA_LENGTH",
                "CHAR_LENGTH",
                "CHAR_USED",
                "DATA_PRECISION",
                "DATA_SCALE",
                "NULLABLE",
                "DATA_DEFAULT",
                "COLUMN_ID",
            ],
            rows,
        )
    }

    fn constraints(&self, params: &[SqlValue]) -> MockResponse {
        let state = self.state.lock();
        let mut tables: Vec<&MockTable> = state.tables(params).collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));

        let mut rows = Vec::new();
        for table in tables {
            let mut constraints: Vec<&MockConstraint> = table.constraints.iter().collect();
            constraints.sort_by(|a, b| a.name.cmp(&b.name));

            for constraint in constraints {
                let (r_owner, r_table, r_columns) = match &constraint.referenced {
                    Some((owner, table, columns)) => {
                        (Some(owner.as_str()), Some(table.as_str()), columns.as_slice())
                    }
                    None => (None, None, &[][..]),
                };
                let generated = if constraint.generated {
                    "GENERATED NAME"
                } else {
                    "USER NAME"
                };

                let mut push = |column: Option<&str>, position: Option<i64>, r_column: Option<&str>| {
                    rows.push(vec![
                        text(&table.name),
                        text(&constraint.name),
                        text(constraint.kind),
                        opt_text(constraint.search_condition.as_deref()),
                        text(generated),
                        opt_text(r_owner),
                        opt_text(r_table),
                        opt_text(r_column),
                        opt_text(constraint.delete_rule),
                        opt_text(column),
                        opt_int(position),
                    ]);
                };

                if constraint.columns.is_empty() {
                    push(None, None, None);
                }
                for (index, column) in constraint.columns.iter().enumerate() {
                    let r_column = r_columns.get(index).map(String::as_str);
                    push(Some(column), Some(index as i64 + 1), r_column);
                }
            }
        }

        MockResponse::rows(
            &[
                "TABLE_NAME",
                "CONSTRAINT_NAME",
                "CONSTRAINT_TYPE",
                "SEARCH_CONDITION",
                "GENERATED",
                "R_OWNER",
                "R_TABLE_NAME",
                "R_COLUMN_NAME",
                "DELETE_RULE",
                "COLUMN_NAME",
                "POSITION",
            ],
            rows,
        )
    }
}
