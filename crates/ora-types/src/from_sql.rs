//! Conversions between Rust types and [`SqlValue`].

use bytes::Bytes;

use crate::error::TypeError;
use crate::value::SqlValue;

/// Conversion from a [`SqlValue`] into a Rust type.
pub trait FromSql: Sized {
    /// Convert a non-null value.
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError>;

    /// Convert a possibly-null value.
    fn from_sql_nullable(value: &SqlValue) -> Result<Option<Self>, TypeError> {
        if value.is_null() {
            Ok(None)
        } else {
            Self::from_sql(value).map(Some)
        }
    }
}

/// Conversion from a Rust type into a bind parameter.
pub trait ToSql {
    /// Convert to a [`SqlValue`].
    fn to_sql(&self) -> SqlValue;
}

fn mismatch(expected: &'static str, value: &SqlValue) -> TypeError {
    if value.is_null() {
        return TypeError::UnexpectedNull;
    }
    TypeError::TypeMismatch {
        expected,
        actual: value.type_name().to_string(),
    }
}

impl FromSql for i64 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Int(v) => Ok(*v),
            #[cfg(feature = "decimal")]
            SqlValue::Decimal(d) => {
                use rust_decimal::prelude::ToPrimitive;
                if !d.fract().is_zero() {
                    return Err(TypeError::OutOfRange {
                        target: "i64",
                        value: d.to_string(),
                    });
                }
                d.to_i64().ok_or_else(|| TypeError::OutOfRange {
                    target: "i64",
                    value: d.to_string(),
                })
            }
            SqlValue::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(*f as i64),
            SqlValue::String(s) => s.trim().parse().map_err(|_| TypeError::TypeMismatch {
                expected: "i64",
                actual: format!("string '{s}'"),
            }),
            other => Err(mismatch("i64", other)),
        }
    }
}

impl FromSql for i32 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        let v = i64::from_sql(value)?;
        i32::try_from(v).map_err(|_| TypeError::OutOfRange {
            target: "i32",
            value: v.to_string(),
        })
    }
}

impl FromSql for u32 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        let v = i64::from_sql(value)?;
        u32::try_from(v).map_err(|_| TypeError::OutOfRange {
            target: "u32",
            value: v.to_string(),
        })
    }
}

impl FromSql for f64 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Float(v) => Ok(*v),
            SqlValue::Int(v) => Ok(*v as f64),
            #[cfg(feature = "decimal")]
            SqlValue::Decimal(d) => {
                use rust_decimal::prelude::ToPrimitive;
                d.to_f64().ok_or_else(|| TypeError::OutOfRange {
                    target: "f64",
                    value: d.to_string(),
                })
            }
            other => Err(mismatch("f64", other)),
        }
    }
}

impl FromSql for bool {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Bool(v) => Ok(*v),
            SqlValue::Int(v) => Ok(*v != 0),
            // Catalog flags are reported as 'Y'/'N'.
            SqlValue::String(s) => match s.trim() {
                "Y" | "y" | "YES" | "TRUE" | "1" => Ok(true),
                "N" | "n" | "NO" | "FALSE" | "0" => Ok(false),
                _ => Err(TypeError::TypeMismatch {
                    expected: "bool",
                    actual: format!("string '{s}'"),
                }),
            },
            other => Err(mismatch("bool", other)),
        }
    }
}

impl FromSql for String {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::String(s) => Ok(s.clone()),
            SqlValue::Int(v) => Ok(v.to_string()),
            #[cfg(feature = "decimal")]
            SqlValue::Decimal(d) => Ok(d.to_string()),
            other => Err(mismatch("String", other)),
        }
    }
}

impl FromSql for Bytes {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Binary(b) => Ok(b.clone()),
            other => Err(mismatch("Bytes", other)),
        }
    }
}

impl FromSql for Vec<u8> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        Bytes::from_sql(value).map(|b| b.to_vec())
    }
}

#[cfg(feature = "decimal")]
impl FromSql for rust_decimal::Decimal {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Decimal(d) => Ok(*d),
            SqlValue::Int(v) => Ok(rust_decimal::Decimal::from(*v)),
            SqlValue::String(s) => s.trim().parse().map_err(|_| TypeError::TypeMismatch {
                expected: "Decimal",
                actual: format!("string '{s}'"),
            }),
            other => Err(mismatch("Decimal", other)),
        }
    }
}

#[cfg(feature = "chrono")]
impl FromSql for chrono::NaiveDateTime {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Date(v) | SqlValue::Timestamp(v) => Ok(*v),
            SqlValue::TimestampTz(v) => Ok(v.naive_utc()),
            other => Err(mismatch("NaiveDateTime", other)),
        }
    }
}

impl<T: FromSql> FromSql for Option<T> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        T::from_sql_nullable(value)
    }
}

macro_rules! impl_to_sql {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> SqlValue {
                    SqlValue::from(self.clone())
                }
            }
        )*
    };
}

impl_to_sql!(bool, i32, i64, u32, f64, String, Bytes);

#[cfg(feature = "decimal")]
impl_to_sql!(rust_decimal::Decimal);

impl ToSql for str {
    fn to_sql(&self) -> SqlValue {
        SqlValue::String(self.to_string())
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> SqlValue {
        self.clone()
    }
}

impl<T: ToSql> ToSql for Option<T> {
    fn to_sql(&self) -> SqlValue {
        self.as_ref().map_or(SqlValue::Null, ToSql::to_sql)
    }
}
