//! Typed cell values.

use bytes::Bytes;

/// A single value exchanged with the driver.
///
/// Oracle has no native integer type; drivers are free to report `NUMBER`
/// columns as [`SqlValue::Int`], [`SqlValue::Decimal`] or even
/// [`SqlValue::String`]. The [`FromSql`](crate::FromSql) implementations accept
/// all of these where the conversion is lossless.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// `BOOLEAN` (23ai) or a driver-mapped flag.
    Bool(bool),
    /// Integral `NUMBER`.
    Int(i64),
    /// `BINARY_DOUBLE`, `BINARY_FLOAT` or `FLOAT`.
    Float(f64),
    /// Exact `NUMBER`.
    #[cfg(feature = "decimal")]
    Decimal(rust_decimal::Decimal),
    /// Character data (`VARCHAR2`, `CHAR`, `CLOB`, ...).
    String(String),
    /// Binary data (`RAW`, `BLOB`, ...).
    Binary(Bytes),
    /// `DATE` (Oracle dates carry a time of day).
    #[cfg(feature = "chrono")]
    Date(chrono::NaiveDateTime),
    /// `TIMESTAMP` without time zone.
    #[cfg(feature = "chrono")]
    Timestamp(chrono::NaiveDateTime),
    /// `TIMESTAMP WITH TIME ZONE`.
    #[cfg(feature = "chrono")]
    TimestampTz(chrono::DateTime<chrono::FixedOffset>),
    /// Native `JSON`.
    #[cfg(feature = "json")]
    Json(serde_json::Value),
}

impl SqlValue {
    /// Check whether the value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short type name used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "BOOLEAN",
            Self::Int(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            #[cfg(feature = "decimal")]
            Self::Decimal(_) => "NUMBER",
            Self::String(_) => "VARCHAR2",
            Self::Binary(_) => "RAW",
            #[cfg(feature = "chrono")]
            Self::Date(_) => "DATE",
            #[cfg(feature = "chrono")]
            Self::Timestamp(_) => "TIMESTAMP",
            #[cfg(feature = "chrono")]
            Self::TimestampTz(_) => "TIMESTAMP WITH TIME ZONE",
            #[cfg(feature = "json")]
            Self::Json(_) => "JSON",
        }
    }

    /// Borrow the value as a string slice if it is character data.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as `i64` if it is an integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as `bool` if it is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            #[cfg(feature = "decimal")]
            Self::Decimal(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Self::Binary(v) => write!(f, "<{} bytes>", v.len()),
            #[cfg(feature = "chrono")]
            Self::Date(v) => write!(f, "{v}"),
            #[cfg(feature = "chrono")]
            Self::Timestamp(v) => write!(f, "{v}"),
            #[cfg(feature = "chrono")]
            Self::TimestampTz(v) => write!(f, "{v}"),
            #[cfg(feature = "json")]
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Bytes> for SqlValue {
    fn from(v: Bytes) -> Self {
        Self::Binary(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(v))
    }
}

#[cfg(feature = "decimal")]
impl From<rust_decimal::Decimal> for SqlValue {
    fn from(v: rust_decimal::Decimal) -> Self {
        Self::Decimal(v)
    }
}

#[cfg(feature = "chrono")]
impl From<chrono::NaiveDateTime> for SqlValue {
    fn from(v: chrono::NaiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_maps_to_null() {
        let v: SqlValue = Option::<i64>::None.into();
        assert!(v.is_null());
        let v: SqlValue = Some("x").into();
        assert_eq!(v.as_str(), Some("x"));
    }

    #[test]
    fn test_display_escapes_quotes() {
        assert_eq!(SqlValue::from("O'Brien").to_string(), "'O''Brien'");
        assert_eq!(SqlValue::Null.to_string(), "NULL");
    }
}
