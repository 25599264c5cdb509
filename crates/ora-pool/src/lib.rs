//! # ora-pool
//!
//! Purpose-built connection pool for Oracle.
//!
//! ## Features
//!
//! - **Bounded size**: never more than `max_connections` physical sessions,
//!   counting ones being opened, probed or closed
//! - **Fair waiting**: callers blocked at capacity are served in arrival order
//! - **Validation**: idle sessions are probed with `SELECT 1 FROM DUAL` once
//!   their validation interval has elapsed; transient failures are retried
//!   with exponential backoff
//! - **Session reset**: open transactions are rolled back before a session is
//!   reused
//! - **Recycling**: idle and over-age sessions are closed by a background
//!   sweep that also replenishes the pool to its minimum size
//! - **Graceful shutdown**: checked-out sessions get a drain window, after
//!   which they are revoked
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use ora_pool::{Pool, PoolConfig};
//!
//! let config = PoolConfig::new()
//!     .min_connections(2)
//!     .max_connections(20)
//!     .idle_timeout(Duration::from_secs(300));
//!
//! let pool = Pool::new(driver, connection_config, config).await?;
//!
//! let mut conn = pool.acquire(Duration::from_secs(1)).await?;
//! conn.raw()?.execute("SELECT 1 FROM DUAL", &[]).await?;
//! pool.release(conn).await;
//!
//! let report = pool.shutdown(Duration::from_secs(10)).await;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod backoff;
pub mod config;
pub mod lifecycle;
pub mod maintenance;
pub mod pool;

pub use backoff::BackoffStrategy;
pub use config::{DEFAULT_VALIDATION_QUERY, PoolConfig};
pub use lifecycle::{
    ConnectionLifecycle, HealthCheckResult, OracleLifecycle, SlotMetadata, SlotState,
};
pub use maintenance::MaintenanceReport;
pub use pool::{Pool, PoolBuilder, PoolMetrics, PoolStatus, PooledConnection, ShutdownReport};
