//! `CREATE TABLE` rendering.

use std::fmt::Write;

use ora_client::quote_identifier;

use crate::descriptor::{ConstraintDescriptor, ConstraintKind, DeleteRule, TableDescriptor};

fn column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn constraint_clause(table: &TableDescriptor, constraint: &ConstraintDescriptor) -> String {
    let mut clause = String::new();
    if !constraint.generated_name {
        let _ = write!(clause, "CONSTRAINT {} ", quote_identifier(&constraint.name));
    }
    let columns = column_list(&constraint.columns);
    match &constraint.kind {
        ConstraintKind::PrimaryKey => {
            let _ = write!(clause, "PRIMARY KEY ({columns})");
        }
        ConstraintKind::Unique => {
            let _ = write!(clause, "UNIQUE ({columns})");
        }
        ConstraintKind::ForeignKey {
            referenced_schema,
            referenced_table,
            referenced_columns,
            on_delete,
        } => {
            let target = if *referenced_schema == table.schema {
                quote_identifier(referenced_table)
            } else {
                format!(
                    "{}.{}",
                    quote_identifier(referenced_schema),
                    quote_identifier(referenced_table)
                )
            };
            let _ = write!(
                clause,
                "FOREIGN KEY ({columns}) REFERENCES {target} ({})",
                column_list(referenced_columns)
            );
            match on_delete {
                DeleteRule::NoAction => {}
                DeleteRule::Cascade => clause.push_str(" ON DELETE CASCADE"),
                DeleteRule::SetNull => clause.push_str(" ON DELETE SET NULL"),
            }
        }
        ConstraintKind::Check { condition } => {
            let _ = write!(clause, "CHECK ({condition})");
        }
    }
    clause
}

impl TableDescriptor {
    /// Render the table as a `CREATE TABLE` statement.
    ///
    /// Columns appear in ordinal order with their defaults and `NOT NULL`.
    /// Constraints follow as out-of-line clauses in the order primary key,
    /// unique keys, checks, foreign keys; system-named constraints are
    /// rendered without a name so the target database generates its own.
    #[must_use]
    pub fn to_ddl(&self) -> String {
        let mut lines: Vec<String> = self
            .columns
            .iter()
            .map(|column| {
                let mut line = format!("{} {}", quote_identifier(&column.name), column.data_type);
                if let Some(default) = &column.default {
                    let _ = write!(line, " DEFAULT {default}");
                }
                if !column.nullable {
                    line.push_str(" NOT NULL");
                }
                line
            })
            .collect();

        let rank = |kind: &ConstraintKind| match kind {
            ConstraintKind::PrimaryKey => 0,
            ConstraintKind::Unique => 1,
            ConstraintKind::Check { .. } => 2,
            ConstraintKind::ForeignKey { .. } => 3,
        };
        let mut constraints: Vec<&ConstraintDescriptor> = self.constraints.iter().collect();
        constraints.sort_by_key(|c| rank(&c.kind));
        lines.extend(constraints.into_iter().map(|c| constraint_clause(self, c)));

        format!(
            "CREATE TABLE {}.{} (\n    {}\n)",
            quote_identifier(&self.schema),
            quote_identifier(&self.name),
            lines.join(",\n    ")
        )
    }
}
