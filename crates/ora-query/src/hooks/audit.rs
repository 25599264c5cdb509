use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use ora_client::ErrorKind;
use parking_lot::Mutex;

use super::{ExecutionContext, ExecutionHook, ExecutionOutcome, HookRejection};

/// How an audited statement ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    /// The statement was refused before it ran.
    Denied,
    /// The statement ran successfully.
    Succeeded {
        /// Rows returned or affected.
        rows: u64,
    },
    /// The statement ran and failed.
    Failed(ErrorKind),
}

/// One entry in the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    /// Statement id assigned by the executor.
    pub statement_id: u64,
    /// Statement classification.
    pub operation: &'static str,
    /// Sanitized statement text.
    pub statement: String,
    /// What happened.
    pub outcome: AuditOutcome,
}

/// Denies configured statement classes and keeps a bounded audit trail.
///
/// Every statement passing through the hook is logged on the
/// `ora_query::audit` target.
#[derive(Debug)]
pub struct SecurityAudit {
    denied: HashSet<&'static str>,
    capacity: usize,
    trail: Mutex<VecDeque<AuditRecord>>,
}

impl SecurityAudit {
    /// An audit hook that denies nothing and keeps up to `capacity` records.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            denied: HashSet::new(),
            capacity,
            trail: Mutex::new(VecDeque::new()),
        }
    }

    /// Deny statements classified as `operation` (for example `DROP`).
    #[must_use]
    pub fn deny(mut self, operation: &'static str) -> Self {
        self.denied.insert(operation);
        self
    }

    /// Deny DDL that destroys data: `DROP` and `TRUNCATE`.
    #[must_use]
    pub fn deny_destructive_ddl(self) -> Self {
        self.deny("DROP").deny("TRUNCATE")
    }

    /// The audit trail, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<AuditRecord> {
        self.trail.lock().iter().cloned().collect()
    }

    fn record(&self, ctx: &ExecutionContext<'_>, outcome: AuditOutcome) {
        tracing::info!(
            target: "ora_query::audit",
            statement_id = ctx.id,
            operation = ctx.operation,
            outcome = ?outcome,
            statement = %ctx.sanitized,
            "statement audited"
        );
        if self.capacity == 0 {
            return;
        }
        let mut trail = self.trail.lock();
        if trail.len() == self.capacity {
            trail.pop_front();
        }
        trail.push_back(AuditRecord {
            statement_id: ctx.id,
            operation: ctx.operation,
            statement: ctx.sanitized.clone(),
            outcome,
        });
    }
}

impl Default for SecurityAudit {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl ExecutionHook for SecurityAudit {
    fn name(&self) -> &str {
        "security-audit"
    }

    async fn before_execute(&self, ctx: &ExecutionContext<'_>) -> Result<(), HookRejection> {
        if self.denied.contains(ctx.operation) {
            self.record(ctx, AuditOutcome::Denied);
            return Err(HookRejection::new(
                self.name(),
                format!("{} statements are not allowed", ctx.operation),
            ));
        }
        Ok(())
    }

    async fn after_execute(&self, ctx: &ExecutionContext<'_>, outcome: &ExecutionOutcome<'_>) {
        let outcome = match outcome.result {
            Ok(rows) => AuditOutcome::Succeeded {
                rows: if rows.columns().is_empty() {
                    rows.rows_affected()
                } else {
                    rows.len() as u64
                },
            },
            Err(err) => AuditOutcome::Failed(err.kind()),
        };
        self.record(ctx, outcome);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ctx(id: u64, operation: &'static str) -> ExecutionContext<'static> {
        ExecutionContext {
            id,
            sql: "",
            params: &[],
            operation,
            sanitized: format!("{operation} ..."),
        }
    }

    #[tokio::test]
    async fn test_denies_configured_operations() {
        let audit = SecurityAudit::new(10).deny_destructive_ddl();
        assert!(audit.before_execute(&ctx(1, "SELECT")).await.is_ok());

        let rejection = audit.before_execute(&ctx(2, "DROP")).await.unwrap_err();
        assert_eq!(rejection.hook, "security-audit");
        assert!(rejection.reason.contains("DROP"));

        let records = audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].statement_id, 2);
        assert_eq!(records[0].outcome, AuditOutcome::Denied);
    }

    #[tokio::test]
    async fn test_trail_is_bounded() {
        let audit = SecurityAudit::new(2).deny("DROP");
        for id in 0..5 {
            let _ = audit.before_execute(&ctx(id, "DROP")).await;
        }
        let ids: Vec<_> = audit.records().iter().map(|r| r.statement_id).collect();
        assert_eq!(ids, vec![3, 4]);
    }
}
