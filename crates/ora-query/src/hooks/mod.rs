//! Execution hooks.
//!
//! Hooks are an ordered list of callbacks wrapped around every statement an
//! [`Executor`](crate::Executor) runs. `before_execute` runs in insertion
//! order before a connection is acquired; the first rejection aborts the
//! statement. `after_execute` runs in insertion order with the outcome,
//! including failures.

mod audit;
mod performance;
mod validator;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ora_client::{Error, RowSet, SqlValue};
use thiserror::Error;

pub use audit::{AuditOutcome, AuditRecord, SecurityAudit};
pub use performance::{OperationStats, PerformanceMonitor};
pub use validator::{StatementValidator, count_bind_placeholders};

/// A hook declined to let a statement run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rejected by {hook}: {reason}")]
pub struct HookRejection {
    /// Name of the rejecting hook.
    pub hook: String,
    /// Human-readable reason.
    pub reason: String,
}

impl HookRejection {
    /// Create a rejection.
    pub fn new(hook: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            hook: hook.into(),
            reason: reason.into(),
        }
    }
}

impl From<HookRejection> for Error {
    fn from(rejection: HookRejection) -> Self {
        Error::Rejected {
            hook: rejection.hook,
            reason: rejection.reason,
        }
    }
}

/// What hooks see about a statement.
#[derive(Debug, Clone)]
pub struct ExecutionContext<'a> {
    /// Executor-unique statement id.
    pub id: u64,
    /// The statement as submitted.
    pub sql: &'a str,
    /// Bind values.
    pub params: &'a [SqlValue],
    /// Statement classification (`SELECT`, `INSERT`, `PLSQL`, ...).
    pub operation: &'static str,
    /// The statement with literals removed, safe to log.
    pub sanitized: String,
}

/// How a statement ended.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionOutcome<'a> {
    /// Time from acquire to result.
    pub elapsed: Duration,
    /// The result.
    pub result: Result<&'a RowSet, &'a Error>,
}

impl ExecutionOutcome<'_> {
    /// Whether the statement succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Rows returned by a query.
    #[must_use]
    pub fn rows_returned(&self) -> usize {
        self.result.map_or(0, RowSet::len)
    }

    /// Rows affected by DML.
    #[must_use]
    pub fn rows_affected(&self) -> u64 {
        self.result.map_or(0, RowSet::rows_affected)
    }
}

/// A callback around statement execution.
#[async_trait]
pub trait ExecutionHook: Send + Sync + 'static {
    /// Name used in rejections and logs.
    fn name(&self) -> &str;

    /// Called before a connection is acquired. An error aborts the statement.
    async fn before_execute(&self, _ctx: &ExecutionContext<'_>) -> Result<(), HookRejection> {
        Ok(())
    }

    /// Called after the statement finished, successfully or not.
    async fn after_execute(&self, _ctx: &ExecutionContext<'_>, _outcome: &ExecutionOutcome<'_>) {}
}

/// An ordered list of hooks.
#[derive(Clone, Default)]
pub struct HookChain {
    hooks: Vec<Arc<dyn ExecutionHook>>,
}

impl HookChain {
    /// An empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook.
    pub fn push(&mut self, hook: Arc<dyn ExecutionHook>) {
        self.hooks.push(hook);
    }

    /// Append a hook, builder style.
    #[must_use]
    pub fn with(mut self, hook: Arc<dyn ExecutionHook>) -> Self {
        self.push(hook);
        self
    }

    /// Number of hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Hook names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.hooks.iter().map(|h| h.name())
    }

    /// Run every `before_execute`, stopping at the first rejection.
    pub async fn before(&self, ctx: &ExecutionContext<'_>) -> Result<(), HookRejection> {
        for hook in &self.hooks {
            if let Err(rejection) = hook.before_execute(ctx).await {
                tracing::debug!(
                    hook = hook.name(),
                    statement_id = ctx.id,
                    reason = %rejection.reason,
                    "statement rejected"
                );
                return Err(rejection);
            }
        }
        Ok(())
    }

    /// Run every `after_execute`.
    pub async fn after(&self, ctx: &ExecutionContext<'_>, outcome: &ExecutionOutcome<'_>) {
        for hook in &self.hooks {
            hook.after_execute(ctx, outcome).await;
        }
    }
}

impl fmt::Debug for HookChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
