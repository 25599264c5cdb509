//! Structured catalog metadata.

use std::time::SystemTime;

use ora_types::DataType;
use serde::{Deserialize, Serialize};

/// One column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name in dictionary form.
    pub name: String,
    /// Normalized data type.
    pub data_type: DataType,
    /// Whether the column accepts `NULL`.
    pub nullable: bool,
    /// Default expression as stored in the dictionary.
    pub default: Option<String>,
    /// 1-based position; contiguous within the table.
    pub ordinal: u32,
}

/// `ON DELETE` behaviour of a foreign key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteRule {
    /// Reject deletes of referenced rows.
    #[default]
    NoAction,
    /// Delete referencing rows.
    Cascade,
    /// Null out referencing columns.
    SetNull,
}

impl DeleteRule {
    /// Parse the `DELETE_RULE` catalog column.
    #[must_use]
    pub fn from_catalog(rule: &str) -> Self {
        match rule.trim().to_uppercase().as_str() {
            "CASCADE" => Self::Cascade,
            "SET NULL" => Self::SetNull,
            _ => Self::NoAction,
        }
    }
}

/// What a constraint enforces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Primary key.
    PrimaryKey,
    /// Unique key.
    Unique,
    /// Foreign key.
    ForeignKey {
        /// Owner of the referenced table.
        referenced_schema: String,
        /// Referenced table.
        referenced_table: String,
        /// Referenced columns, positionally matching the constraint columns.
        referenced_columns: Vec<String>,
        /// `ON DELETE` behaviour.
        on_delete: DeleteRule,
    },
    /// Check constraint.
    Check {
        /// The search condition.
        condition: String,
    },
}

/// A named table constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintDescriptor {
    /// Constraint name.
    pub name: String,
    /// Constraint type and type-specific details.
    pub kind: ConstraintKind,
    /// Constrained columns in key order. Empty for table-level checks.
    pub columns: Vec<String>,
    /// Whether the name was generated by the database (`SYS_C...`).
    pub generated_name: bool,
}

/// A table with its columns and constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Owning schema.
    pub schema: String,
    /// Table name.
    pub name: String,
    /// Columns ordered by ordinal.
    pub columns: Vec<ColumnDescriptor>,
    /// Constraints ordered by name.
    pub constraints: Vec<ConstraintDescriptor>,
    /// When the catalog was read.
    pub retrieved_at: SystemTime,
}

impl TableDescriptor {
    /// Look up a column by name (case-insensitive).
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// The primary key, if any.
    #[must_use]
    pub fn primary_key(&self) -> Option<&ConstraintDescriptor> {
        self.constraints
            .iter()
            .find(|c| c.kind == ConstraintKind::PrimaryKey)
    }

    /// Foreign keys.
    pub fn foreign_keys(&self) -> impl Iterator<Item = &ConstraintDescriptor> {
        self.constraints
            .iter()
            .filter(|c| matches!(c.kind, ConstraintKind::ForeignKey { .. }))
    }

    /// `SCHEMA.TABLE`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// A schema with its tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    /// Schema (owner) name.
    pub name: String,
    /// Tables ordered by name.
    pub tables: Vec<TableDescriptor>,
    /// When the catalog was read.
    pub retrieved_at: SystemTime,
}

impl SchemaDescriptor {
    /// Look up a table by name (case-insensitive).
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Table names in order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }
}
