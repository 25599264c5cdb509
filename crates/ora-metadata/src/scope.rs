//! Cache scope keys.

use std::fmt;
use std::str::FromStr;

use ora_client::{Error, Result, normalize_identifier, quote_identifier};
use serde::{Deserialize, Serialize};

/// The scope metadata is cached under: a schema, or one table in a schema.
///
/// Names are stored in data dictionary form. Construct keys with
/// [`ScopeKey::schema`] / [`ScopeKey::table`] (or parse them) so user input
/// like `sales.orders` and `SALES.ORDERS` maps to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScopeKey {
    /// A whole schema.
    Schema(String),
    /// One table.
    Table {
        /// Owning schema.
        schema: String,
        /// Table name.
        table: String,
    },
}

impl ScopeKey {
    /// Key for a schema.
    pub fn schema(name: &str) -> Result<Self> {
        Ok(Self::Schema(normalize_identifier(name)?))
    }

    /// Key for a table.
    pub fn table(schema: &str, table: &str) -> Result<Self> {
        Ok(Self::Table {
            schema: normalize_identifier(schema)?,
            table: normalize_identifier(table)?,
        })
    }

    /// The schema this key belongs to.
    #[must_use]
    pub fn schema_name(&self) -> &str {
        match self {
            Self::Schema(schema) | Self::Table { schema, .. } => schema,
        }
    }

    /// The table name, for table keys.
    #[must_use]
    pub fn table_name(&self) -> Option<&str> {
        match self {
            Self::Schema(_) => None,
            Self::Table { table, .. } => Some(table),
        }
    }

    /// Whether this key covers a single table.
    #[must_use]
    pub fn is_table(&self) -> bool {
        matches!(self, Self::Table { .. })
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema(schema) => f.write_str(&quote_identifier(schema)),
            Self::Table { schema, table } => write!(
                f,
                "{}.{}",
                quote_identifier(schema),
                quote_identifier(table)
            ),
        }
    }
}

/// Split on the first `.` that is not inside double quotes.
fn split_qualified(s: &str) -> Option<(&str, &str)> {
    let mut quoted = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '.' if !quoted => return Some((&s[..i], &s[i + 1..])),
            _ => {}
        }
    }
    None
}

impl FromStr for ScopeKey {
    type Err = Error;

    /// Parse `schema` or `schema.table`; either part may be double-quoted.
    fn from_str(s: &str) -> Result<Self> {
        match split_qualified(s) {
            Some((schema, table)) => Self::table(schema, table),
            None => Self::schema(s),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_normalized() {
        assert_eq!(
            ScopeKey::table("sales", "orders").unwrap(),
            ScopeKey::table("SALES", "Orders").unwrap()
        );
        let key = ScopeKey::table("sales", "\"Line Items\"").unwrap();
        assert_eq!(key.schema_name(), "SALES");
        assert_eq!(key.table_name(), Some("Line Items"));
        assert_eq!(key.to_string(), "SALES.\"Line Items\"");
    }

    #[test]
    fn test_parse() {
        assert_eq!("sales".parse::<ScopeKey>().unwrap(), ScopeKey::Schema("SALES".into()));
        assert_eq!(
            "\"a.b\".orders".parse::<ScopeKey>().unwrap(),
            ScopeKey::Table {
                schema: "a.b".into(),
                table: "ORDERS".into()
            }
        );
        assert!("sales.".parse::<ScopeKey>().is_err());
        assert!("1sales".parse::<ScopeKey>().is_err());
    }
}
