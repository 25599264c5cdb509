//! Query results: [`RowSet`] and its [`Row`]s.

use std::sync::Arc;

use ora_types::{FromSql, SqlValue, TypeError};

use crate::driver::{ColumnInfo, RawRows};
use crate::error::Error;

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Column index.
    pub index: usize,
    /// Oracle type name.
    pub type_name: String,
    /// Whether the column is nullable.
    pub nullable: bool,
}

/// One result row. Column metadata is shared with the owning [`RowSet`].
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<[Column]>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Convert the value at `index` (0-based).
    pub fn get<T: FromSql>(&self, index: usize) -> Result<T, TypeError> {
        self.values
            .get(index)
            .ok_or_else(|| TypeError::TypeMismatch {
                expected: "column index",
                actual: format!("{index} (row has {} columns)", self.values.len()),
            })
            .and_then(T::from_sql)
    }

    /// Convert the value of column `name`, matched case-insensitively.
    pub fn get_by_name<T: FromSql>(&self, name: &str) -> Result<T, TypeError> {
        match self.position(name) {
            Some(index) => self.get(index),
            None => Err(TypeError::TypeMismatch {
                expected: "column name",
                actual: format!("no column {name}"),
            }),
        }
    }

    /// Like [`Row::get`], but `NULL`, a missing column and a failed
    /// conversion all give `None`.
    pub fn try_get<T: FromSql>(&self, index: usize) -> Option<T> {
        self.values
            .get(index)
            .and_then(|v| T::from_sql_nullable(v).ok().flatten())
    }

    /// Like [`Row::get_by_name`], with the same leniency as [`Row::try_get`].
    pub fn try_get_by_name<T: FromSql>(&self, name: &str) -> Option<T> {
        self.try_get(self.position(name)?)
    }

    /// The unconverted value at `index`.
    #[must_use]
    pub fn get_raw(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column metadata.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The values in column order.
    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Columns paired with their values.
    pub fn iter(&self) -> impl Iterator<Item = (&Column, &SqlValue)> {
        self.columns.iter().zip(&self.values)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }
}

impl IntoIterator for Row {
    type Item = SqlValue;
    type IntoIter = std::vec::IntoIter<SqlValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// The structured result of one statement: ordered rows of ordered values.
#[derive(Debug, Clone)]
pub struct RowSet {
    columns: Arc<[Column]>,
    rows: Vec<Row>,
    rows_affected: u64,
}

impl RowSet {
    /// Validate and convert a driver result.
    ///
    /// Every row must have exactly one value per column; a mismatch means the
    /// driver violated its contract and is reported as [`Error::Protocol`].
    pub fn from_raw(raw: RawRows) -> Result<Self, Error> {
        let RawRows {
            columns,
            rows,
            rows_affected,
        } = raw;

        let width = columns.len();
        let columns: Arc<[Column]> = columns
            .into_iter()
            .enumerate()
            .map(|(index, ColumnInfo { name, type_name, nullable })| Column {
                name,
                index,
                type_name,
                nullable,
            })
            .collect();

        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, values)| {
                if values.len() != width {
                    return Err(Error::Protocol(format!(
                        "row {i} has {} values for {width} columns",
                        values.len()
                    )));
                }
                Ok(Row {
                    columns: Arc::clone(&columns),
                    values,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            columns,
            rows,
            rows_affected,
        })
    }

    /// Column metadata shared by every row.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The rows, in the order the driver returned them.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Rows affected by DML (0 for queries).
    #[must_use]
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first row, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }
}

impl IntoIterator for RowSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a RowSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn raw() -> RawRows {
        RawRows::new(
            vec![ColumnInfo::new("ID", "NUMBER"), ColumnInfo::new("NAME", "VARCHAR2")],
            vec![
                vec![SqlValue::Int(1), SqlValue::from("alpha")],
                vec![SqlValue::Int(2), SqlValue::Null],
            ],
        )
    }

    #[test]
    fn test_rowset_preserves_order_and_types() {
        let set = RowSet::from_raw(raw()).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.columns()[1].index, 1);

        let first = set.first().unwrap();
        assert_eq!(first.get::<i64>(0).unwrap(), 1);
        assert_eq!(first.get_by_name::<String>("name").unwrap(), "alpha");

        let second = &set.rows()[1];
        assert_eq!(second.try_get_by_name::<String>("NAME"), None);
        assert!(second.get::<String>(1).is_err());
    }

    #[test]
    fn test_rowset_rejects_ragged_rows() {
        let mut bad = raw();
        bad.rows[1].pop();
        let err = RowSet::from_raw(bad).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn test_dml_result() {
        let set = RowSet::from_raw(RawRows::affected(3)).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.rows_affected(), 3);
    }
}
