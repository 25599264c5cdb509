//! Connection lifecycle management.
//!
//! A [`ConnectionLifecycle`] decides how a session is initialized after it
//! opens, how it is probed, and how it is cleaned before reuse. The default,
//! [`OracleLifecycle`], runs the configured init statements, validates with
//! `SELECT 1 FROM DUAL` (or the driver ping) and rolls back any open
//! transaction on release.

use std::time::Duration;

use async_trait::async_trait;
use ora_client::{DriverError, RawConnection};
use tokio::time::Instant;

/// State of a pooled connection slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotState {
    /// Waiting in the idle queue.
    Idle,
    /// Checked out by exactly one caller.
    InUse,
    /// Being probed by the pool.
    Validating,
    /// Closed; never handed out again.
    Closed,
}

/// Bookkeeping for one pooled connection.
#[derive(Debug, Clone)]
pub struct SlotMetadata {
    /// Unique slot id (never reused within a pool).
    pub id: u64,
    /// When the physical connection was opened.
    pub created_at: Instant,
    /// When the slot was last checked out or returned.
    pub last_used: Instant,
    /// When the slot was last known to be healthy.
    pub last_validated: Instant,
    /// Number of checkouts.
    pub use_count: u64,
    /// Current state.
    pub state: SlotState,
}

impl SlotMetadata {
    pub(crate) fn new(id: u64) -> Self {
        let now = Instant::now();
        Self {
            id,
            created_at: now,
            last_used: now,
            last_validated: now,
            use_count: 0,
            state: SlotState::Validating,
        }
    }

    /// Age of the physical connection.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Time since the slot was last used.
    #[must_use]
    pub fn idle_time(&self) -> Duration {
        self.last_used.elapsed()
    }

    /// Whether the connection has outlived `max_lifetime`.
    #[must_use]
    pub fn is_expired(&self, max_lifetime: Option<Duration>) -> bool {
        max_lifetime.is_some_and(|max| self.age() >= max)
    }

    /// Whether the slot must be probed before it is handed out.
    #[must_use]
    pub fn needs_validation(&self, interval: Duration) -> bool {
        self.last_validated.elapsed() >= interval
    }
}

/// Outcome of a health probe.
#[derive(Debug, Clone)]
pub enum HealthCheckResult {
    /// The probe succeeded.
    Healthy {
        /// Round-trip time of the successful attempt.
        latency: Duration,
        /// Attempts made, including retries.
        attempts: u32,
    },
    /// The probe failed; the connection must be discarded.
    Unhealthy {
        /// The last failure.
        error: DriverError,
        /// Attempts made, including retries.
        attempts: u32,
    },
}

impl HealthCheckResult {
    /// Whether the probe succeeded.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy { .. })
    }
}

/// Hooks for connection setup, validation and cleanup.
#[async_trait]
pub trait ConnectionLifecycle: Send + Sync + 'static {
    /// Initialize a freshly opened session.
    async fn on_connect(&self, _conn: &mut dyn RawConnection) -> Result<(), DriverError> {
        Ok(())
    }

    /// Check that a session is usable.
    async fn validate(&self, conn: &mut dyn RawConnection) -> Result<(), DriverError>;

    /// Clean a session before it goes back to idle. An error discards it.
    async fn reset(&self, conn: &mut dyn RawConnection) -> Result<(), DriverError>;
}

/// Default lifecycle for Oracle sessions.
#[derive(Debug, Clone, Default)]
pub struct OracleLifecycle {
    validation_query: Option<String>,
    init_statements: Vec<String>,
}

impl OracleLifecycle {
    /// Create a lifecycle with the given validation query and init statements.
    #[must_use]
    pub fn new(validation_query: Option<String>, init_statements: Vec<String>) -> Self {
        Self {
            validation_query,
            init_statements,
        }
    }
}

#[async_trait]
impl ConnectionLifecycle for OracleLifecycle {
    async fn on_connect(&self, conn: &mut dyn RawConnection) -> Result<(), DriverError> {
        for sql in &self.init_statements {
            conn.execute(sql, &[]).await?;
        }
        Ok(())
    }

    async fn validate(&self, conn: &mut dyn RawConnection) -> Result<(), DriverError> {
        match &self.validation_query {
            Some(sql) => conn.execute(sql, &[]).await.map(|_| ()),
            None => conn.ping().await,
        }
    }

    async fn reset(&self, conn: &mut dyn RawConnection) -> Result<(), DriverError> {
        if !conn.session_state().is_dirty() {
            return Ok(());
        }
        conn.rollback().await?;
        let after = conn.session_state();
        if after.is_dirty() {
            return Err(DriverError::statement(format!(
                "session still dirty after rollback: {after:?}"
            )));
        }
        Ok(())
    }
}
