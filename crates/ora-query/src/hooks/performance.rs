use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ExecutionContext, ExecutionHook, ExecutionOutcome};

/// Aggregated timings for one statement class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationStats {
    /// Statements observed.
    pub count: u64,
    /// Statements that failed.
    pub errors: u64,
    /// Statements slower than the slow threshold.
    pub slow: u64,
    /// Sum of elapsed times.
    pub total: Duration,
    /// Longest elapsed time.
    pub max: Duration,
}

impl OperationStats {
    /// Mean elapsed time.
    #[must_use]
    pub fn average(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total.as_nanos() / u128::from(self.count);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// Records per-operation timings and logs slow statements.
#[derive(Debug)]
pub struct PerformanceMonitor {
    slow_threshold: Duration,
    stats: Mutex<HashMap<&'static str, OperationStats>>,
}

impl PerformanceMonitor {
    /// Create a monitor that flags statements slower than `slow_threshold`.
    #[must_use]
    pub fn new(slow_threshold: Duration) -> Self {
        Self {
            slow_threshold,
            stats: Mutex::new(HashMap::new()),
        }
    }

    /// Stats for one operation (`SELECT`, `INSERT`, ...).
    #[must_use]
    pub fn stats(&self, operation: &str) -> Option<OperationStats> {
        self.stats.lock().get(operation).copied()
    }

    /// Stats for every operation seen so far, sorted by operation.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(&'static str, OperationStats)> {
        let mut all: Vec<_> = self.stats.lock().iter().map(|(k, v)| (*k, *v)).collect();
        all.sort_by_key(|(op, _)| *op);
        all
    }

    /// Forget everything recorded so far.
    pub fn reset(&self) {
        self.stats.lock().clear();
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl ExecutionHook for PerformanceMonitor {
    fn name(&self) -> &str {
        "performance"
    }

    async fn after_execute(&self, ctx: &ExecutionContext<'_>, outcome: &ExecutionOutcome<'_>) {
        let slow = outcome.elapsed >= self.slow_threshold;
        {
            let mut stats = self.stats.lock();
            let entry = stats.entry(ctx.operation).or_default();
            entry.count += 1;
            entry.total += outcome.elapsed;
            entry.max = entry.max.max(outcome.elapsed);
            if !outcome.is_success() {
                entry.errors += 1;
            }
            if slow {
                entry.slow += 1;
            }
        }

        if slow {
            tracing::warn!(
                statement_id = ctx.id,
                operation = ctx.operation,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                threshold_ms = self.slow_threshold.as_millis() as u64,
                statement = %ctx.sanitized,
                "slow statement"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ora_client::{Error, RawRows, RowSet};

    fn ctx(operation: &'static str) -> ExecutionContext<'static> {
        ExecutionContext {
            id: 7,
            sql: "",
            params: &[],
            operation,
            sanitized: String::new(),
        }
    }

    #[tokio::test]
    async fn test_records_counts_errors_and_slow() {
        let monitor = PerformanceMonitor::new(Duration::from_millis(50));
        let rows = RowSet::from_raw(RawRows::empty()).unwrap();
        let err = Error::PoolClosed;

        monitor
            .after_execute(
                &ctx("SELECT"),
                &ExecutionOutcome { elapsed: Duration::from_millis(10), result: Ok(&rows) },
            )
            .await;
        monitor
            .after_execute(
                &ctx("SELECT"),
                &ExecutionOutcome { elapsed: Duration::from_millis(90), result: Err(&err) },
            )
            .await;

        let stats = monitor.stats("SELECT").unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.slow, 1);
        assert_eq!(stats.max, Duration::from_millis(90));
        assert_eq!(stats.average(), Duration::from_millis(50));

        monitor.reset();
        assert!(monitor.snapshot().is_empty());
    }
}
