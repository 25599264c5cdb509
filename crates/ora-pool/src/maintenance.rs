//! Background maintenance: idle eviction, idle validation and replenishment.

use std::sync::{Arc, Weak};
use std::time::Duration;

use ora_client::Result;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::lifecycle::HealthCheckResult;
use crate::pool::{Pool, PoolInner, Probing, Reservation, Slot};

/// What a maintenance pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Idle connections closed for idleness or age.
    pub evicted: u32,
    /// Idle connections that passed validation.
    pub validated: u32,
    /// Idle connections that failed validation and were closed.
    pub failed_validation: u32,
    /// Connections opened to get back to the minimum size.
    pub created: u32,
}

impl MaintenanceReport {
    /// Whether the pass changed nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.evicted == 0 && self.failed_validation == 0 && self.created == 0
    }
}

impl Pool {
    /// Close idle connections past their idle timeout (only while above the
    /// minimum size) or past their maximum lifetime (always).
    ///
    /// Returns the number of connections closed.
    pub async fn evict_idle(&self) -> u32 {
        let inner = &self.inner;
        let victims: Vec<(Slot, &'static str)> = {
            let mut state = inner.state.lock();
            let mut surplus = state.size.saturating_sub(inner.config.min_connections);
            let mut keep = std::collections::VecDeque::with_capacity(state.idle.len());
            let mut victims = Vec::new();

            // Front of the queue was returned longest ago.
            while let Some(slot) = state.idle.pop_front() {
                if slot.meta.is_expired(inner.config.max_lifetime) {
                    surplus = surplus.saturating_sub(1);
                    victims.push((slot, "max lifetime reached"));
                } else if surplus > 0 && slot.meta.idle_time() >= inner.config.idle_timeout {
                    surplus -= 1;
                    victims.push((slot, "idle timeout"));
                } else {
                    keep.push_back(slot);
                }
            }
            state.idle = keep;
            state.closing += victims.len() as u32;
            victims
        };

        let evicted = victims.len() as u32;
        for (slot, reason) in victims {
            {
                let mut metrics = inner.metrics.lock();
                if reason == "idle timeout" {
                    metrics.idle_evictions += 1;
                } else {
                    metrics.lifetime_expirations += 1;
                }
            }
            inner.finish_close(slot, reason).await;
        }

        if evicted > 0 {
            tracing::debug!(evicted, "evicted idle connections");
        }
        evicted
    }

    /// Probe idle connections. With `stale_only`, only those whose validation
    /// interval has elapsed.
    ///
    /// Healthy connections go back to idle (or straight to a waiter); failing
    /// ones are closed. Returns `(healthy, failed)`.
    pub async fn validate_idle(&self, stale_only: bool) -> (u32, u32) {
        let inner = &self.inner;
        let batch: Vec<Probing<'_>> = {
            let mut state = inner.state.lock();
            let interval = inner.config.validation_interval;
            let (probe, keep): (Vec<Slot>, Vec<Slot>) = state
                .idle
                .drain(..)
                .partition(|slot| !stale_only || slot.meta.needs_validation(interval));
            state.idle.extend(keep);
            state.validating += probe.len() as u32;
            probe
                .into_iter()
                .map(|slot| Probing::new(inner, slot))
                .collect()
        };

        let mut healthy = 0;
        let mut failed = 0;
        for mut probing in batch {
            let Some(slot) = probing.slot_mut() else {
                continue;
            };
            let id = slot.meta.id;
            let result = inner.probe(&mut *slot.conn, None).await;
            match result {
                HealthCheckResult::Healthy { .. } => {
                    slot.meta.last_validated = Instant::now();
                    healthy += 1;
                    if let Some(slot) = probing.into_idle() {
                        inner.close_in_use(slot, "pool closed").await;
                    }
                }
                HealthCheckResult::Unhealthy { error, attempts } => {
                    failed += 1;
                    tracing::warn!(
                        slot_id = id,
                        attempts,
                        error = %error,
                        "idle connection failed validation; evicting"
                    );
                    if let Some(slot) = probing.into_closing() {
                        inner.finish_close(slot, "validation failed").await;
                    }
                }
            }
        }

        (healthy, failed)
    }

    /// Open connections until the pool reaches its minimum size.
    ///
    /// Stops at the first failure and returns it. Returns the number of
    /// connections opened.
    pub async fn ensure_min(&self) -> Result<u32> {
        let inner = &self.inner;
        let deficit = {
            let mut state = inner.state.lock();
            if state.closed {
                return Ok(0);
            }
            let deficit = inner.config.min_connections.saturating_sub(state.size);
            state.size += deficit;
            state.creating += deficit;
            deficit
        };

        let mut reservations: Vec<Reservation<'_>> =
            (0..deficit).map(|_| Reservation::new(inner)).collect();
        let mut created = 0;

        while let Some(reservation) = reservations.pop() {
            let slot = inner.open_slot(None).await?;
            created += 1;
            if let Some(slot) = reservation.into_idle(slot) {
                inner.close_in_use(slot, "pool closed").await;
            }
        }

        if created > 0 {
            tracing::debug!(created, "replenished pool to minimum size");
        }
        Ok(created)
    }

    /// Run one maintenance pass: evict, validate stale idle connections, then
    /// replenish to the minimum.
    pub async fn run_maintenance(&self) -> MaintenanceReport {
        let evicted = self.evict_idle().await;
        let (validated, failed_validation) = self.validate_idle(true).await;
        let created = match self.ensure_min().await {
            Ok(created) => created,
            Err(e) => {
                tracing::warn!(error = %e, "failed to replenish pool");
                0
            }
        };

        let report = MaintenanceReport {
            evicted,
            validated,
            failed_validation,
            created,
        };
        if !report.is_noop() {
            tracing::debug!(?report, status = ?self.status(), "maintenance pass complete");
        }
        report
    }
}

/// Spawn the periodic sweep. The task holds only a weak reference and ends
/// when the pool is dropped or closed.
pub(crate) fn spawn_sweeper(inner: &Arc<PoolInner>, period: Duration) -> JoinHandle<()> {
    let weak: Weak<PoolInner> = Arc::downgrade(inner);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let Some(inner) = weak.upgrade() else {
                break;
            };
            if inner.is_closed() {
                break;
            }
            let pool = Pool { inner };
            pool.run_maintenance().await;
        }
        tracing::trace!("pool sweeper stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maintenance_report_noop() {
        assert!(MaintenanceReport::default().is_noop());
        let report = MaintenanceReport {
            validated: 3,
            ..MaintenanceReport::default()
        };
        assert!(report.is_noop());
        let report = MaintenanceReport {
            evicted: 1,
            ..MaintenanceReport::default()
        };
        assert!(!report.is_noop());
    }
}
