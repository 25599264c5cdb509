//! # ora-client
//!
//! Building blocks shared by every layer of the Oracle access stack.
//!
//! - [`Driver`] / [`RawConnection`]: the seam to the driver collaborator that
//!   owns the wire protocol
//! - [`Config`]: connection configuration with EZConnect and key-value
//!   connect-string parsing
//! - [`Error`] / [`Result`]: the single result envelope used by the pool,
//!   executor and metadata cache
//! - [`RowSet`] / [`Row`]: structured statement results
//! - [`instrumentation`]: statement classification and sanitization for logs
//!
//! ## Example
//!
//! ```rust
//! use ora_client::Config;
//!
//! let config = Config::from_connection_string("scott/tiger@localhost:1521/FREEPDB1")?;
//! assert_eq!(config.service_name, "FREEPDB1");
//! assert_eq!(config.credentials.username(), Some("scott"));
//! # Ok::<(), ora_client::Error>(())
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod driver;
pub mod error;
pub mod identifier;
pub mod instrumentation;
pub mod query;
pub mod row;

// Re-export commonly used types
pub use config::{Config, Credentials};
pub use driver::{ColumnInfo, Driver, RawConnection, RawRows, SessionState};
pub use error::{DriverError, DriverErrorKind, Error, ErrorKind, Result};
pub use identifier::{normalize_identifier, quote_identifier, validate_identifier};
pub use ora_types::{DataType, FromSql, SqlValue, ToSql, TypeError};
pub use query::Query;
pub use row::{Column, Row, RowSet};
