//! Driver collaborator interface.
//!
//! The workspace does not speak the Oracle wire protocol. A driver (an OCI
//! binding, a thin-protocol client, or the in-memory mock from `ora-testing`)
//! implements [`Driver`] to open physical sessions and [`RawConnection`] to
//! run statements on them. Everything above this seam (pooling, validation,
//! cancellation, metadata assembly) is driver-agnostic.

use async_trait::async_trait;
use ora_types::SqlValue;

use crate::config::Config;
use crate::error::DriverError;

/// Opens physical database sessions.
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    /// Open a new session using `config`.
    async fn open(&self, config: &Config) -> Result<Box<dyn RawConnection>, DriverError>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "oracle"
    }
}

/// One physical database session.
///
/// A session is used by one caller at a time; the pool guarantees exclusive
/// access through `&mut self`.
#[async_trait]
pub trait RawConnection: Send + 'static {
    /// Execute a statement with positional bind values.
    ///
    /// Queries return their columns and rows; DML returns an empty column list
    /// and the affected row count.
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<RawRows, DriverError>;

    /// Lightweight round-trip to check that the session is alive.
    async fn ping(&mut self) -> Result<(), DriverError>;

    /// Commit the open transaction.
    async fn commit(&mut self) -> Result<(), DriverError>;

    /// Roll back the open transaction.
    async fn rollback(&mut self) -> Result<(), DriverError>;

    /// Abandon the in-flight call after its future was dropped and bring the
    /// session back to a usable state.
    ///
    /// An error means the session cannot be trusted and will be discarded.
    async fn cancel(&mut self) -> Result<(), DriverError>;

    /// Close the session. Errors are logged and otherwise ignored.
    async fn close(&mut self) -> Result<(), DriverError>;

    /// Session state that must be cleaned up before the session is reused.
    fn session_state(&self) -> SessionState {
        SessionState::default()
    }
}

/// Per-session state relevant to reuse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionState {
    /// A transaction is open (uncommitted DML).
    pub in_transaction: bool,
    /// Number of cursors left open.
    pub open_cursors: u32,
}

impl SessionState {
    /// Whether the session needs a reset before reuse.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.in_transaction || self.open_cursors > 0
    }
}

/// Column description returned by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name as reported by the driver.
    pub name: String,
    /// Oracle type name (`VARCHAR2`, `NUMBER`, ...).
    pub type_name: String,
    /// Whether the column may contain NULL.
    pub nullable: bool,
}

impl ColumnInfo {
    /// Create a nullable column description.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: true,
        }
    }
}

/// Unvalidated statement result as produced by a driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRows {
    /// Column descriptions, in select-list order.
    pub columns: Vec<ColumnInfo>,
    /// Row values; each row should have one value per column.
    pub rows: Vec<Vec<SqlValue>>,
    /// Rows affected by DML.
    pub rows_affected: u64,
}

impl RawRows {
    /// A result with no columns and no rows.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A DML result.
    #[must_use]
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            ..Self::default()
        }
    }

    /// A query result.
    #[must_use]
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns,
            rows,
            rows_affected: 0,
        }
    }
}
