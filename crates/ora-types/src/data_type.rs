//! Normalized Oracle column data types.
//!
//! Oracle reports column types in two shapes:
//!
//! - in DDL text: `VARCHAR2(100 CHAR)`, `NUMBER(10,2)`,
//!   `TIMESTAMP(3) WITH TIME ZONE`, `INTERVAL DAY(2) TO SECOND(6)`
//! - in the catalog views (`ALL_TAB_COLUMNS`): a `DATA_TYPE` name plus
//!   separate `DATA_LENGTH`, `CHAR_LENGTH`, `CHAR_USED`, `DATA_PRECISION` and
//!   `DATA_SCALE` columns
//!
//! Both are normalized into [`DataType`], whose [`Display`](std::fmt::Display)
//! renders canonical DDL text.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Default fractional seconds precision for `TIMESTAMP` and `INTERVAL DAY TO SECOND`.
const DEFAULT_FRACTIONAL_PRECISION: u8 = 6;
/// Default leading field precision for `INTERVAL` types.
const DEFAULT_INTERVAL_PRECISION: u8 = 2;
/// Default length for `UROWID`.
const DEFAULT_UROWID_LENGTH: u32 = 4000;

/// A normalized Oracle column type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum DataType {
    /// `VARCHAR2(n [BYTE|CHAR])`.
    Varchar2 {
        /// Maximum length.
        length: u32,
        /// Whether the length counts characters rather than bytes.
        char_semantics: bool,
    },
    /// `NVARCHAR2(n)`, length in characters.
    NVarchar2 {
        /// Maximum length in characters.
        length: u32,
    },
    /// `CHAR(n [BYTE|CHAR])`.
    Char {
        /// Fixed length.
        length: u32,
        /// Whether the length counts characters rather than bytes.
        char_semantics: bool,
    },
    /// `NCHAR(n)`, length in characters.
    NChar {
        /// Fixed length in characters.
        length: u32,
    },
    /// `NUMBER`, `NUMBER(p)`, `NUMBER(p,s)`, `NUMBER(*,s)` or `INTEGER`.
    Number {
        /// Decimal precision, `None` for the maximum.
        precision: Option<u8>,
        /// Scale, `None` for floating.
        scale: Option<i8>,
    },
    /// `FLOAT(p)` with binary precision.
    Float {
        /// Binary precision, `None` for the default (126).
        precision: Option<u8>,
    },
    /// `BINARY_FLOAT`.
    BinaryFloat,
    /// `BINARY_DOUBLE`.
    BinaryDouble,
    /// `DATE`.
    Date,
    /// `TIMESTAMP(s)`.
    Timestamp {
        /// Fractional seconds precision.
        scale: u8,
    },
    /// `TIMESTAMP(s) WITH TIME ZONE`.
    TimestampTz {
        /// Fractional seconds precision.
        scale: u8,
    },
    /// `TIMESTAMP(s) WITH LOCAL TIME ZONE`.
    TimestampLtz {
        /// Fractional seconds precision.
        scale: u8,
    },
    /// `INTERVAL YEAR(p) TO MONTH`.
    IntervalYearToMonth {
        /// Year precision.
        precision: u8,
    },
    /// `INTERVAL DAY(p) TO SECOND(s)`.
    IntervalDayToSecond {
        /// Day precision.
        day_precision: u8,
        /// Fractional seconds precision.
        scale: u8,
    },
    /// `RAW(n)`.
    Raw {
        /// Maximum length in bytes.
        length: u32,
    },
    /// `LONG RAW`.
    LongRaw,
    /// `LONG`.
    Long,
    /// `CLOB`.
    Clob,
    /// `NCLOB`.
    NClob,
    /// `BLOB`.
    Blob,
    /// `BFILE`.
    BFile,
    /// `ROWID`.
    RowId,
    /// `UROWID(n)`.
    URowId {
        /// Maximum length in bytes.
        length: u32,
    },
    /// `XMLTYPE`.
    Xml,
    /// `JSON`.
    Json,
    /// `BOOLEAN`.
    Boolean,
    /// Any other type (object types, `SDO_GEOMETRY`, ...), kept verbatim.
    Other {
        /// Uppercased type name.
        name: String,
    },
}

/// Catalog description of a column type, as read from `ALL_TAB_COLUMNS`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogType<'a> {
    /// `DATA_TYPE`.
    pub name: &'a str,
    /// `DATA_LENGTH` (bytes).
    pub data_length: Option<u32>,
    /// `CHAR_LENGTH` (characters).
    pub char_length: Option<u32>,
    /// `CHAR_USED` (`'B'` or `'C'`).
    pub char_used: Option<&'a str>,
    /// `DATA_PRECISION`.
    pub precision: Option<u32>,
    /// `DATA_SCALE`.
    pub scale: Option<i32>,
}

static PAREN_GROUP: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\(([^)]*)\)").unwrap()
});

impl DataType {
    /// Parse a DDL type declaration such as `NUMBER(10,2)` or
    /// `TIMESTAMP(3) WITH TIME ZONE`.
    ///
    /// Unknown type names are kept as [`DataType::Other`].
    pub fn parse(decl: &str) -> Result<Self, TypeError> {
        let upper = decl.trim().to_uppercase();
        if upper.is_empty() {
            return Err(TypeError::InvalidTypeName(decl.to_string()));
        }

        let groups: Vec<String> = PAREN_GROUP
            .captures_iter(&upper)
            .filter_map(|c| c.get(1).map(|m| m.as_str().trim().to_string()))
            .collect();
        let name = PAREN_GROUP
            .replace_all(&upper, " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        let invalid = || TypeError::InvalidTypeName(decl.to_string());
        let first = groups.first().map(String::as_str);

        let ty = match name.as_str() {
            "VARCHAR2" | "VARCHAR" => {
                let (length, char_semantics) = parse_length(first.ok_or_else(invalid)?, decl)?;
                Self::Varchar2 {
                    length,
                    char_semantics,
                }
            }
            "NVARCHAR2" => Self::NVarchar2 {
                length: parse_length(first.ok_or_else(invalid)?, decl)?.0,
            },
            "CHAR" | "CHARACTER" => {
                let (length, char_semantics) = match first {
                    Some(arg) => parse_length(arg, decl)?,
                    None => (1, false),
                };
                Self::Char {
                    length,
                    char_semantics,
                }
            }
            "NCHAR" => Self::NChar {
                length: match first {
                    Some(arg) => parse_length(arg, decl)?.0,
                    None => 1,
                },
            },
            "NUMBER" | "NUMERIC" | "DECIMAL" | "DEC" => {
                let (precision, scale) = match first {
                    None => (None, None),
                    Some(args) => parse_precision_scale(args, decl)?,
                };
                Self::Number { precision, scale }
            }
            "INTEGER" | "INT" | "SMALLINT" => Self::Number {
                precision: None,
                scale: Some(0),
            },
            "FLOAT" => Self::Float {
                precision: first.map(|p| parse_u8(p, decl)).transpose()?,
            },
            "DOUBLE PRECISION" => Self::Float {
                precision: Some(126),
            },
            "REAL" => Self::Float {
                precision: Some(63),
            },
            "BINARY_FLOAT" => Self::BinaryFloat,
            "BINARY_DOUBLE" => Self::BinaryDouble,
            "DATE" => Self::Date,
            "TIMESTAMP" => Self::Timestamp {
                scale: fractional(first, decl)?,
            },
            "TIMESTAMP WITH TIME ZONE" => Self::TimestampTz {
                scale: fractional(first, decl)?,
            },
            "TIMESTAMP WITH LOCAL TIME ZONE" => Self::TimestampLtz {
                scale: fractional(first, decl)?,
            },
            "INTERVAL YEAR TO MONTH" => Self::IntervalYearToMonth {
                precision: match first {
                    Some(p) => parse_u8(p, decl)?,
                    None => DEFAULT_INTERVAL_PRECISION,
                },
            },
            "INTERVAL DAY TO SECOND" => {
                let day_precision = match first {
                    Some(p) => parse_u8(p, decl)?,
                    None => DEFAULT_INTERVAL_PRECISION,
                };
                let scale = fractional(groups.get(1).map(String::as_str), decl)?;
                Self::IntervalDayToSecond {
                    day_precision,
                    scale,
                }
            }
            "RAW" => Self::Raw {
                length: parse_u32(first.ok_or_else(invalid)?, decl)?,
            },
            "LONG RAW" => Self::LongRaw,
            "LONG" => Self::Long,
            "CLOB" => Self::Clob,
            "NCLOB" => Self::NClob,
            "BLOB" => Self::Blob,
            "BFILE" => Self::BFile,
            "ROWID" => Self::RowId,
            "UROWID" => Self::URowId {
                length: match first {
                    Some(n) => parse_u32(n, decl)?,
                    None => DEFAULT_UROWID_LENGTH,
                },
            },
            "XMLTYPE" | "SYS.XMLTYPE" => Self::Xml,
            "JSON" => Self::Json,
            "BOOLEAN" => Self::Boolean,
            _ => Self::Other { name: upper },
        };

        Ok(ty)
    }

    /// Normalize a catalog column description.
    ///
    /// Length and precision information comes from the separate catalog
    /// columns; the `DATA_TYPE` name only carries it for timestamp and interval
    /// types (e.g. `TIMESTAMP(6) WITH TIME ZONE`).
    pub fn from_catalog(catalog: CatalogType<'_>) -> Result<Self, TypeError> {
        let name = catalog.name.trim().to_uppercase();
        let char_semantics = catalog
            .char_used
            .is_some_and(|c| c.trim().eq_ignore_ascii_case("C"));
        let char_len = || {
            if char_semantics {
                catalog.char_length.or(catalog.data_length)
            } else {
                catalog.data_length
            }
            .unwrap_or(1)
        };

        let ty = match name.as_str() {
            "VARCHAR2" | "VARCHAR" => Self::Varchar2 {
                length: char_len(),
                char_semantics,
            },
            "CHAR" => Self::Char {
                length: char_len(),
                char_semantics,
            },
            // National character types always use character semantics.
            "NVARCHAR2" => Self::NVarchar2 {
                length: catalog.char_length.or(catalog.data_length).unwrap_or(1),
            },
            "NCHAR" => Self::NChar {
                length: catalog.char_length.or(catalog.data_length).unwrap_or(1),
            },
            "NUMBER" => Self::Number {
                precision: catalog.precision.map(|p| clamp_u8(p, catalog.name)).transpose()?,
                scale: catalog.scale.map(|s| clamp_i8(s, catalog.name)).transpose()?,
            },
            "FLOAT" => Self::Float {
                precision: catalog.precision.map(|p| clamp_u8(p, catalog.name)).transpose()?,
            },
            "RAW" => Self::Raw {
                length: catalog.data_length.unwrap_or(1),
            },
            "UROWID" => Self::URowId {
                length: catalog.data_length.unwrap_or(DEFAULT_UROWID_LENGTH),
            },
            _ => Self::parse(&name)?,
        };

        Ok(ty)
    }

    /// Whether this is a character type.
    #[must_use]
    pub fn is_character(&self) -> bool {
        matches!(
            self,
            Self::Varchar2 { .. }
                | Self::NVarchar2 { .. }
                | Self::Char { .. }
                | Self::NChar { .. }
                | Self::Long
                | Self::Clob
                | Self::NClob
        )
    }

    /// Whether this is a numeric type.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Number { .. } | Self::Float { .. } | Self::BinaryFloat | Self::BinaryDouble
        )
    }

    /// Whether this is a date, timestamp or interval type.
    #[must_use]
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            Self::Date
                | Self::Timestamp { .. }
                | Self::TimestampTz { .. }
                | Self::TimestampLtz { .. }
                | Self::IntervalYearToMonth { .. }
                | Self::IntervalDayToSecond { .. }
        )
    }

    /// Whether this is a large object type.
    #[must_use]
    pub fn is_lob(&self) -> bool {
        matches!(self, Self::Clob | Self::NClob | Self::Blob | Self::BFile)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let semantics = |char_semantics: bool| if char_semantics { " CHAR" } else { "" };
        match self {
            Self::Varchar2 {
                length,
                char_semantics,
            } => write!(f, "VARCHAR2({length}{})", semantics(*char_semantics)),
            Self::NVarchar2 { length } => write!(f, "NVARCHAR2({length})"),
            Self::Char {
                length,
                char_semantics,
            } => write!(f, "CHAR({length}{})", semantics(*char_semantics)),
            Self::NChar { length } => write!(f, "NCHAR({length})"),
            Self::Number { precision, scale } => match (precision, scale) {
                (None, None) => f.write_str("NUMBER"),
                (None, Some(0)) => f.write_str("INTEGER"),
                (None, Some(s)) => write!(f, "NUMBER(*,{s})"),
                (Some(p), None | Some(0)) => write!(f, "NUMBER({p})"),
                (Some(p), Some(s)) => write!(f, "NUMBER({p},{s})"),
            },
            Self::Float { precision: None } => f.write_str("FLOAT"),
            Self::Float { precision: Some(p) } => write!(f, "FLOAT({p})"),
            Self::BinaryFloat => f.write_str("BINARY_FLOAT"),
            Self::BinaryDouble => f.write_str("BINARY_DOUBLE"),
            Self::Date => f.write_str("DATE"),
            Self::Timestamp { scale } => write!(f, "TIMESTAMP({scale})"),
            Self::TimestampTz { scale } => write!(f, "TIMESTAMP({scale}) WITH TIME ZONE"),
            Self::TimestampLtz { scale } => write!(f, "TIMESTAMP({scale}) WITH LOCAL TIME ZONE"),
            Self::IntervalYearToMonth { precision } => {
                write!(f, "INTERVAL YEAR({precision}) TO MONTH")
            }
            Self::IntervalDayToSecond {
                day_precision,
                scale,
            } => write!(f, "INTERVAL DAY({day_precision}) TO SECOND({scale})"),
            Self::Raw { length } => write!(f, "RAW({length})"),
            Self::LongRaw => f.write_str("LONG RAW"),
            Self::Long => f.write_str("LONG"),
            Self::Clob => f.write_str("CLOB"),
            Self::NClob => f.write_str("NCLOB"),
            Self::Blob => f.write_str("BLOB"),
            Self::BFile => f.write_str("BFILE"),
            Self::RowId => f.write_str("ROWID"),
            Self::URowId { length } => write!(f, "UROWID({length})"),
            Self::Xml => f.write_str("XMLTYPE"),
            Self::Json => f.write_str("JSON"),
            Self::Boolean => f.write_str("BOOLEAN"),
            Self::Other { name } => f.write_str(name),
        }
    }
}

/// Parse `100`, `100 CHAR` or `100 BYTE`.
fn parse_length(arg: &str, decl: &str) -> Result<(u32, bool), TypeError> {
    let mut parts = arg.split_whitespace();
    let length = parse_u32(parts.next().unwrap_or_default(), decl)?;
    let char_semantics = match parts.next() {
        None | Some("BYTE") => false,
        Some("CHAR") => true,
        Some(_) => return Err(TypeError::InvalidTypeName(decl.to_string())),
    };
    Ok((length, char_semantics))
}

/// Parse `p`, `p,s` or `*,s`.
fn parse_precision_scale(args: &str, decl: &str) -> Result<(Option<u8>, Option<i8>), TypeError> {
    let (p, s) = match args.split_once(',') {
        Some((p, s)) => (p.trim(), Some(s.trim())),
        None => (args.trim(), None),
    };
    let precision = if p == "*" { None } else { Some(parse_u8(p, decl)?) };
    let scale = match s {
        Some(s) => Some(
            s.parse::<i8>()
                .map_err(|_| TypeError::InvalidTypeName(decl.to_string()))?,
        ),
        // NUMBER(p) is an integer type with scale 0.
        None if precision.is_some() => Some(0),
        None => None,
    };
    Ok((precision, scale))
}

fn fractional(arg: Option<&str>, decl: &str) -> Result<u8, TypeError> {
    match arg {
        Some(s) => parse_u8(s, decl),
        None => Ok(DEFAULT_FRACTIONAL_PRECISION),
    }
}

fn parse_u8(s: &str, decl: &str) -> Result<u8, TypeError> {
    s.trim()
        .parse()
        .map_err(|_| TypeError::InvalidTypeName(decl.to_string()))
}

fn parse_u32(s: &str, decl: &str) -> Result<u32, TypeError> {
    s.trim()
        .parse()
        .map_err(|_| TypeError::InvalidTypeName(decl.to_string()))
}

fn clamp_u8(v: u32, name: &str) -> Result<u8, TypeError> {
    u8::try_from(v).map_err(|_| TypeError::OutOfRange {
        target: "precision",
        value: format!("{v} ({name})"),
    })
}

fn clamp_i8(v: i32, name: &str) -> Result<i8, TypeError> {
    i8::try_from(v).map_err(|_| TypeError::OutOfRange {
        target: "scale",
        value: format!("{v} ({name})"),
    })
}
