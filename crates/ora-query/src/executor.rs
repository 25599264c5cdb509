//! Statement execution on pooled connections.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use ora_client::instrumentation::{DB_SYSTEM, extract_operation, is_dml};
use ora_client::{Error, Query, Result, RowSet};
use ora_pool::{Pool, PooledConnection};
use tokio::time::Instant;

use crate::config::ExecutorConfig;
use crate::hooks::{ExecutionContext, ExecutionHook, ExecutionOutcome, HookChain};

/// Runs statements on connections borrowed from a [`Pool`].
///
/// Every execution acquires a connection, runs the statement under a time
/// budget, returns the connection to the pool on every exit path and wraps
/// the driver's result or failure in [`Result`]. Statement-level failures
/// leave the connection reusable; connection-level failures (and timeouts
/// the driver could not cancel) discard it.
#[derive(Debug, Clone)]
pub struct Executor {
    pool: Pool,
    hooks: HookChain,
    config: ExecutorConfig,
    next_id: Arc<AtomicU64>,
}

impl Executor {
    /// Create an executor with default configuration and no hooks.
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            hooks: HookChain::new(),
            config: ExecutorConfig::default(),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Create an executor with the given configuration.
    pub fn with_config(pool: Pool, config: ExecutorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(pool)
        })
    }

    /// Append an execution hook.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn ExecutionHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// The hooks run around every statement.
    #[must_use]
    pub fn hooks(&self) -> &HookChain {
        &self.hooks
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// The executor configuration.
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute a statement using the configured statement timeout.
    pub async fn execute(&self, query: impl Into<Query>) -> Result<RowSet> {
        self.execute_with_timeout(query, self.config.statement_timeout)
            .await
    }

    /// Execute a statement within `timeout`.
    ///
    /// The budget covers both acquisition and execution. Running out while
    /// waiting for a connection yields [`Error::AcquireTimeout`]; running out
    /// during the call yields [`Error::ExecutionTimeout`].
    pub async fn execute_with_timeout(
        &self,
        query: impl Into<Query>,
        timeout: Duration,
    ) -> Result<RowSet> {
        let query = query.into();
        let ctx = self.context(&query);
        self.hooks.before(&ctx).await?;

        let started = Instant::now();
        let deadline = started + timeout;
        let result = match self.pool.acquire(timeout).await {
            Ok(mut conn) => {
                let budget = deadline.saturating_duration_since(Instant::now());
                let result = self.run(&mut conn, &query, budget).await;
                conn.release().await;
                result
            }
            Err(Error::PoolExhausted { .. }) => Err(Error::AcquireTimeout { timeout }),
            Err(e) => Err(e),
        };

        self.finish(&ctx, started, result).await
    }

    /// Execute a statement on a connection the caller already holds.
    ///
    /// Used for multi-statement work on one session. The connection is not
    /// released; if it had to be discarded it is marked broken.
    pub async fn execute_on(
        &self,
        conn: &mut PooledConnection,
        query: impl Into<Query>,
        timeout: Duration,
    ) -> Result<RowSet> {
        let query = query.into();
        let ctx = self.context(&query);
        self.hooks.before(&ctx).await?;

        let started = Instant::now();
        let result = self.run(conn, &query, timeout).await;
        self.finish(&ctx, started, result).await
    }

    fn context<'q>(&self, query: &'q Query) -> ExecutionContext<'q> {
        ExecutionContext {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            sql: query.sql(),
            params: query.params(),
            operation: extract_operation(query.sql()),
            sanitized: self.config.sanitization.sanitize(query.sql()),
        }
    }

    async fn finish(
        &self,
        ctx: &ExecutionContext<'_>,
        started: Instant,
        result: Result<RowSet>,
    ) -> Result<RowSet> {
        let elapsed = started.elapsed();
        match &result {
            Ok(rows) => tracing::debug!(
                db.system = DB_SYSTEM,
                statement_id = ctx.id,
                operation = ctx.operation,
                rows = rows.len(),
                rows_affected = rows.rows_affected(),
                elapsed_ms = elapsed.as_millis() as u64,
                statement = %ctx.sanitized,
                "statement executed"
            ),
            Err(e) => tracing::warn!(
                db.system = DB_SYSTEM,
                statement_id = ctx.id,
                operation = ctx.operation,
                error = %e,
                elapsed_ms = elapsed.as_millis() as u64,
                statement = %ctx.sanitized,
                "statement failed"
            ),
        }

        let outcome = ExecutionOutcome {
            elapsed,
            result: result.as_ref(),
        };
        self.hooks.after(ctx, &outcome).await;
        result
    }

    async fn run(
        &self,
        conn: &mut PooledConnection,
        query: &Query,
        budget: Duration,
    ) -> Result<RowSet> {
        let sql = query.sql();
        let params = query.params();

        let call = tokio::time::timeout(budget, conn.raw()?.execute(sql, params)).await;
        match call {
            Ok(Ok(raw)) => {
                let rows = match RowSet::from_raw(raw) {
                    Ok(rows) => rows,
                    Err(e) => {
                        conn.mark_broken();
                        return Err(e);
                    }
                };
                conn.mark_validated();
                if self.config.autocommit && conn.session_state().in_transaction {
                    self.commit(conn).await?;
                }
                Ok(rows)
            }
            Ok(Err(driver_err)) => {
                let err = Error::from_driver(driver_err);
                if err.is_connection_fatal() {
                    conn.mark_broken();
                } else if self.config.autocommit
                    && is_dml(extract_operation(sql))
                    && conn.session_state().in_transaction
                {
                    self.rollback(conn).await;
                }
                Err(err)
            }
            Err(_elapsed) => {
                let cancelled = self.cancel(conn).await;
                Err(Error::ExecutionTimeout {
                    timeout: budget,
                    cancelled,
                })
            }
        }
    }

    async fn commit(&self, conn: &mut PooledConnection) -> Result<()> {
        let result = tokio::time::timeout(self.config.cancel_grace, conn.raw()?.commit()).await;
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(driver_err)) => {
                let err = Error::from_driver(driver_err);
                if err.is_connection_fatal() {
                    conn.mark_broken();
                }
                Err(err)
            }
            Err(_) => {
                conn.mark_broken();
                Err(Error::ExecutionTimeout {
                    timeout: self.config.cancel_grace,
                    cancelled: false,
                })
            }
        }
    }

    async fn rollback(&self, conn: &mut PooledConnection) {
        let Ok(raw) = conn.raw() else {
            return;
        };
        let result = tokio::time::timeout(self.config.cancel_grace, raw.rollback()).await;
        if !matches!(result, Ok(Ok(()))) {
            tracing::warn!(slot_id = conn.id(), "rollback after failed statement did not complete");
            conn.mark_broken();
        }
    }

    /// Abandon the in-flight call. Returns whether the session is reusable.
    async fn cancel(&self, conn: &mut PooledConnection) -> bool {
        let Ok(raw) = conn.raw() else {
            conn.mark_broken();
            return false;
        };
        let result = tokio::time::timeout(self.config.cancel_grace, raw.cancel()).await;
        match result {
            Ok(Ok(())) => {
                tracing::debug!(slot_id = conn.id(), "timed-out statement cancelled");
                true
            }
            Ok(Err(e)) => {
                tracing::warn!(slot_id = conn.id(), error = %e, "cancel failed, discarding connection");
                conn.mark_broken();
                false
            }
            Err(_) => {
                tracing::warn!(slot_id = conn.id(), "cancel did not complete, discarding connection");
                conn.mark_broken();
                false
            }
        }
    }
}
