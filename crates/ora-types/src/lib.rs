//! # ora-types
//!
//! Oracle to Rust type mappings and conversions.
//!
//! This crate carries the values that flow between the driver collaborator and
//! the rest of the workspace:
//!
//! - [`SqlValue`]: a single typed cell value as produced by a driver
//! - [`DataType`]: a normalized Oracle column type as reported by the catalog
//!   views (`ALL_TAB_COLUMNS`) or written in DDL
//! - [`FromSql`] / [`ToSql`]: conversions between Rust types and [`SqlValue`]
//!
//! ## Example
//!
//! ```rust
//! use ora_types::{DataType, FromSql, SqlValue};
//!
//! let ty = DataType::parse("varchar2(100 char)").unwrap();
//! assert_eq!(ty.to_string(), "VARCHAR2(100 CHAR)");
//!
//! let n = i64::from_sql(&SqlValue::Int(42)).unwrap();
//! assert_eq!(n, 42);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod data_type;
pub mod error;
pub mod from_sql;
pub mod value;

pub use data_type::{CatalogType, DataType};
pub use error::TypeError;
pub use from_sql::{FromSql, ToSql};
pub use value::SqlValue;
