//! # ora-access
//!
//! Managed access to an Oracle database: a bounded connection pool, a query
//! executor with timeout budgets and execution hooks, and a single-flight
//! metadata cache, behind one [`Database`] handle.
//!
//! The wire protocol is supplied by a [`Driver`] implementation; this crate
//! only manages sessions opened through it. Every operation returns the
//! shared [`Result`] envelope, whose [`Error::kind`] distinguishes pool
//! exhaustion, lost connections, statement failures and timeouts.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use ora_access::{Database, DatabaseConfig, ErrorKind, Query, RefreshPolicy};
//!
//! #[tokio::main]
//! async fn main() -> ora_access::Result<()> {
//!     let config = DatabaseConfig::from_connection_string("scott/tiger@db:1521/ORCLPDB1")?;
//!     let db = Database::connect(driver(), config).await?;
//!
//!     let orders = db.get_table("sales", "orders", RefreshPolicy::PreferCache).await?;
//!     println!("{}", orders.to_ddl());
//!
//!     let rows = db
//!         .execute(Query::new("SELECT STATUS FROM SALES.ORDERS WHERE ORDER_ID = :1").bind(&42))
//!         .await?;
//!     for row in &rows {
//!         let status: String = row.get(0)?;
//!         println!("{status}");
//!     }
//!
//!     match db.execute("INSERT INTO SALES.ORDERS (ORDER_ID) VALUES (42)").await {
//!         Err(e) if e.kind() == ErrorKind::Statement => println!("rejected: {e}"),
//!         other => { other?; }
//!     }
//!
//!     db.shutdown(Duration::from_secs(10)).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod database;

pub use config::DatabaseConfig;
pub use database::{Database, DatabaseBuilder};

pub use ora_client::{
    Config, Credentials, DataType, Driver, DriverError, DriverErrorKind, Error, ErrorKind,
    FromSql, Query, RawConnection, Result, Row, RowSet, SqlValue, ToSql,
};
pub use ora_metadata::{
    CacheConfig, CacheStats, Cached, ColumnDescriptor, ConstraintDescriptor, ConstraintKind,
    RefreshPolicy, SchemaDescriptor, ScopeKey, TableDescriptor,
};
pub use ora_pool::{PoolConfig, PoolMetrics, PoolStatus, PooledConnection, ShutdownReport};
pub use ora_query::{
    ExecutionHook, ExecutorConfig, PerformanceMonitor, SecurityAudit, StatementValidator,
};
