//! Catalog introspection.
//!
//! Descriptors are assembled from the `ALL_*` dictionary views, read on one
//! pooled connection per fetch through the [`Executor`], so execution hooks
//! and timeout handling apply to catalog queries like to any other
//! statement.
//!
//! Two normalizations happen during assembly:
//!
//! - columns are sorted by `COLUMN_ID` and renumbered from 1, so ordinals are
//!   contiguous even when the dictionary has gaps
//! - system-generated `"COL" IS NOT NULL` check constraints are folded into
//!   column nullability

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use ora_client::{Error, Query, Result, Row, RowSet, SqlValue};
use ora_query::Executor;
use ora_types::{CatalogType, DataType};
use tokio::time::Instant;

use crate::descriptor::{
    ColumnDescriptor, ConstraintDescriptor, ConstraintKind, DeleteRule, SchemaDescriptor,
    TableDescriptor,
};

const SCHEMA_EXISTS_SQL: &str = "SELECT USERNAME FROM ALL_USERS WHERE USERNAME = :1";

const TABLES_SQL: &str = "SELECT TABLE_NAME FROM ALL_TABLES \
     WHERE OWNER = :1 AND NESTED = 'NO' AND SECONDARY = 'N' \
     ORDER BY TABLE_NAME";

const TABLE_EXISTS_SQL: &str =
    "SELECT TABLE_NAME FROM ALL_TABLES WHERE OWNER = :1 AND TABLE_NAME = :2";

const COLUMNS_SQL: &str = "SELECT TABLE_NAME, COLUMN_NAME, DATA_TYPE, DATA_LENGTH, CHAR_LENGTH, \
     CHAR_USED, DATA_PRECISION, DATA_SCALE, NULLABLE, DATA_DEFAULT, COLUMN_ID \
     FROM ALL_TAB_COLUMNS WHERE OWNER = :1";

const CONSTRAINTS_SQL: &str = "SELECT c.TABLE_NAME, c.CONSTRAINT_NAME, c.CONSTRAINT_TYPE, \
     c.SEARCH_CONDITION, c.GENERATED, c.R_OWNER, r.TABLE_NAME AS R_TABLE_NAME, \
     rc.COLUMN_NAME AS R_COLUMN_NAME, c.DELETE_RULE, cc.COLUMN_NAME, cc.POSITION \
     FROM ALL_CONSTRAINTS c \
     LEFT JOIN ALL_CONS_COLUMNS cc \
       ON cc.OWNER = c.OWNER AND cc.CONSTRAINT_NAME = c.CONSTRAINT_NAME \
     LEFT JOIN ALL_CONSTRAINTS r \
       ON r.OWNER = c.R_OWNER AND r.CONSTRAINT_NAME = c.R_CONSTRAINT_NAME \
     LEFT JOIN ALL_CONS_COLUMNS rc \
       ON rc.OWNER = r.OWNER AND rc.CONSTRAINT_NAME = r.CONSTRAINT_NAME \
      AND rc.POSITION = cc.POSITION \
     WHERE c.OWNER = :1 AND c.CONSTRAINT_TYPE IN ('P', 'U', 'R', 'C')";

fn for_table(base: &str, column: &str) -> String {
    format!("{base} AND {column} = :2")
}

/// Reads descriptors from the data dictionary.
#[derive(Debug, Clone)]
pub struct Introspector {
    executor: Executor,
    fetch_timeout: Duration,
}

impl Introspector {
    /// Create an introspector that runs catalog queries through `executor`.
    #[must_use]
    pub fn new(executor: Executor, fetch_timeout: Duration) -> Self {
        Self {
            executor,
            fetch_timeout,
        }
    }

    /// Read a schema with all of its tables.
    ///
    /// `owner` must be in dictionary form. Fails with
    /// [`Error::ObjectNotFound`] if the schema does not exist.
    pub async fn fetch_schema(&self, owner: &str) -> Result<SchemaDescriptor> {
        let mut session = self.session().await?;
        let result = session.schema(owner).await;
        session.close().await;
        result
    }

    /// Read one table.
    ///
    /// Names must be in dictionary form. Fails with
    /// [`Error::ObjectNotFound`] if the table does not exist.
    pub async fn fetch_table(&self, owner: &str, table: &str) -> Result<TableDescriptor> {
        let mut session = self.session().await?;
        let result = session.table(owner, table).await;
        session.close().await;
        result
    }

    async fn session(&self) -> Result<Session<'_>> {
        let deadline = Instant::now() + self.fetch_timeout;
        let conn = match self.executor.pool().acquire(self.fetch_timeout).await {
            Ok(conn) => conn,
            Err(Error::PoolExhausted { .. }) => {
                return Err(Error::AcquireTimeout {
                    timeout: self.fetch_timeout,
                });
            }
            Err(e) => return Err(e),
        };
        Ok(Session {
            executor: &self.executor,
            conn,
            deadline,
        })
    }
}

struct Session<'a> {
    executor: &'a Executor,
    conn: ora_pool::PooledConnection,
    deadline: Instant,
}

impl Session<'_> {
    async fn query(&mut self, sql: impl Into<String>, params: Vec<SqlValue>) -> Result<RowSet> {
        let budget = self.deadline.saturating_duration_since(Instant::now());
        let query = Query::new(sql).with_params(params);
        self.executor.execute_on(&mut self.conn, query, budget).await
    }

    async fn close(self) {
        self.conn.release().await;
    }

    async fn schema(&mut self, owner: &str) -> Result<SchemaDescriptor> {
        let binds = vec![SqlValue::from(owner)];
        let retrieved_at = SystemTime::now();

        if self.query(SCHEMA_EXISTS_SQL, binds.clone()).await?.is_empty() {
            return Err(Error::ObjectNotFound(format!("schema {owner}")));
        }

        let names = self
            .query(TABLES_SQL, binds.clone())
            .await?
            .rows()
            .iter()
            .map(|row| row.get_by_name::<String>("TABLE_NAME"))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let columns = self
            .query(format!("{COLUMNS_SQL} ORDER BY TABLE_NAME, COLUMN_ID"), binds.clone())
            .await?;
        let constraints = self
            .query(
                format!("{CONSTRAINTS_SQL} ORDER BY c.TABLE_NAME, c.CONSTRAINT_NAME, cc.POSITION"),
                binds,
            )
            .await?;

        let tables = assemble(owner, &names, &columns, &constraints, retrieved_at)?;
        tracing::debug!(schema = owner, tables = tables.len(), "schema introspected");
        Ok(SchemaDescriptor {
            name: owner.to_string(),
            tables,
            retrieved_at,
        })
    }

    async fn table(&mut self, owner: &str, table: &str) -> Result<TableDescriptor> {
        let binds = vec![SqlValue::from(owner), SqlValue::from(table)];
        let retrieved_at = SystemTime::now();

        if self.query(TABLE_EXISTS_SQL, binds.clone()).await?.is_empty() {
            return Err(Error::ObjectNotFound(format!("table {owner}.{table}")));
        }

        let columns = self
            .query(
                format!("{} ORDER BY COLUMN_ID", for_table(COLUMNS_SQL, "TABLE_NAME")),
                binds.clone(),
            )
            .await?;
        let constraints = self
            .query(
                format!(
                    "{} ORDER BY c.CONSTRAINT_NAME, cc.POSITION",
                    for_table(CONSTRAINTS_SQL, "c.TABLE_NAME")
                ),
                binds,
            )
            .await?;

        let names = [table.to_string()];
        assemble(owner, &names, &columns, &constraints, retrieved_at)?
            .pop()
            .ok_or_else(|| Error::ObjectNotFound(format!("table {owner}.{table}")))
    }
}

struct ColumnRow {
    table: String,
    column_id: i64,
    descriptor: ColumnDescriptor,
}

fn column_row(row: &Row) -> Result<ColumnRow> {
    let data_type: String = row.get_by_name("DATA_TYPE")?;
    let char_used: Option<String> = row.get_by_name("CHAR_USED")?;
    let catalog = CatalogType {
        name: &data_type,
        data_length: row.get_by_name("DATA_LENGTH")?,
        char_length: row.get_by_name("CHAR_LENGTH")?,
        char_used: char_used.as_deref(),
        precision: row.get_by_name("DATA_PRECISION")?,
        scale: row.get_by_name("DATA_SCALE")?,
    };
    let nullable: String = row.get_by_name("NULLABLE")?;
    let default: Option<String> = row.get_by_name("DATA_DEFAULT")?;

    Ok(ColumnRow {
        table: row.get_by_name("TABLE_NAME")?,
        column_id: row.get_by_name::<Option<i64>>("COLUMN_ID")?.unwrap_or(i64::MAX),
        descriptor: ColumnDescriptor {
            name: row.get_by_name("COLUMN_NAME")?,
            data_type: DataType::from_catalog(catalog)?,
            nullable: nullable.trim() != "N",
            default: default
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            ordinal: 0,
        },
    })
}

struct ConstraintRow {
    table: String,
    name: String,
    kind: String,
    condition: Option<String>,
    generated: bool,
    r_owner: Option<String>,
    r_table: Option<String>,
    r_column: Option<String>,
    delete_rule: Option<String>,
    column: Option<String>,
}

fn constraint_row(row: &Row) -> Result<ConstraintRow> {
    let generated: Option<String> = row.get_by_name("GENERATED")?;
    Ok(ConstraintRow {
        table: row.get_by_name("TABLE_NAME")?,
        name: row.get_by_name("CONSTRAINT_NAME")?,
        kind: row.get_by_name("CONSTRAINT_TYPE")?,
        condition: row.get_by_name("SEARCH_CONDITION")?,
        generated: generated.is_some_and(|g| g.starts_with("GENERATED")),
        r_owner: row.get_by_name("R_OWNER")?,
        r_table: row.get_by_name("R_TABLE_NAME")?,
        r_column: row.get_by_name("R_COLUMN_NAME")?,
        delete_rule: row.get_by_name("DELETE_RULE")?,
        column: row.get_by_name("COLUMN_NAME")?,
    })
}

#[derive(Default)]
struct TableParts {
    columns: Vec<(i64, ColumnDescriptor)>,
    constraints: Vec<ConstraintRow>,
}

/// Build table descriptors for `names` from catalog rows.
///
/// Tables without any column rows are skipped; they were dropped between
/// queries.
fn assemble(
    owner: &str,
    names: &[String],
    columns: &RowSet,
    constraints: &RowSet,
    retrieved_at: SystemTime,
) -> Result<Vec<TableDescriptor>> {
    let mut parts: HashMap<&str, TableParts> = names
        .iter()
        .map(|n| (n.as_str(), TableParts::default()))
        .collect();

    for row in columns {
        let row = column_row(row)?;
        if let Some(part) = parts.get_mut(row.table.as_str()) {
            part.columns.push((row.column_id, row.descriptor));
        }
    }
    for row in constraints {
        let row = constraint_row(row)?;
        if let Some(part) = parts.get_mut(row.table.as_str()) {
            part.constraints.push(row);
        }
    }

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let Some(part) = parts.remove(name.as_str()) else {
            continue;
        };
        if part.columns.is_empty() {
            tracing::debug!(schema = owner, table = %name, "table has no columns, skipping");
            continue;
        }
        tables.push(build_table(owner, name, part, retrieved_at));
    }
    Ok(tables)
}

fn build_table(
    owner: &str,
    name: &str,
    part: TableParts,
    retrieved_at: SystemTime,
) -> TableDescriptor {
    let mut columns = part.columns;
    columns.sort_by_key(|(id, _)| *id);
    let mut columns: Vec<ColumnDescriptor> = columns
        .into_iter()
        .zip(1u32..)
        .map(|((_, mut column), ordinal)| {
            column.ordinal = ordinal;
            column
        })
        .collect();

    let mut constraints: Vec<ConstraintDescriptor> = Vec::new();
    for row in part.constraints {
        if let Some(existing) = constraints.iter_mut().find(|c| c.name == row.name) {
            if let Some(column) = row.column {
                existing.columns.push(column);
            }
            if let (ConstraintKind::ForeignKey { referenced_columns, .. }, Some(r_column)) =
                (&mut existing.kind, row.r_column)
            {
                referenced_columns.push(r_column);
            }
            continue;
        }

        let kind = match row.kind.trim() {
            "P" => ConstraintKind::PrimaryKey,
            "U" => ConstraintKind::Unique,
            "R" => ConstraintKind::ForeignKey {
                referenced_schema: row.r_owner.unwrap_or_else(|| owner.to_string()),
                referenced_table: row.r_table.unwrap_or_default(),
                referenced_columns: row.r_column.into_iter().collect(),
                on_delete: row
                    .delete_rule
                    .as_deref()
                    .map(DeleteRule::from_catalog)
                    .unwrap_or_default(),
            },
            "C" => ConstraintKind::Check {
                condition: row.condition.unwrap_or_default().trim().to_string(),
            },
            other => {
                tracing::debug!(constraint = %row.name, kind = other, "skipping constraint type");
                continue;
            }
        };
        constraints.push(ConstraintDescriptor {
            name: row.name,
            kind,
            columns: row.column.into_iter().collect(),
            generated_name: row.generated,
        });
    }

    constraints.retain(|constraint| match not_null_column(constraint) {
        Some(target) => {
            if let Some(column) = columns.iter_mut().find(|c| c.name == target) {
                column.nullable = false;
            }
            false
        }
        None => true,
    });
    constraints.sort_by(|a, b| a.name.cmp(&b.name));

    TableDescriptor {
        schema: owner.to_string(),
        name: name.to_string(),
        columns,
        constraints,
        retrieved_at,
    }
}

/// The column a system-generated `NOT NULL` check applies to.
fn not_null_column(constraint: &ConstraintDescriptor) -> Option<&str> {
    let ConstraintKind::Check { condition } = &constraint.kind else {
        return None;
    };
    if !constraint.generated_name {
        return None;
    }
    let [column] = constraint.columns.as_slice() else {
        return None;
    };
    let expected = format!("\"{column}\" IS NOT NULL");
    condition
        .eq_ignore_ascii_case(&expected)
        .then_some(column.as_str())
}
