//! The pool core: slot accounting, FIFO waiters, checkout and return.
//!
//! Bookkeeping lives in one [`PoolState`] behind a `parking_lot` mutex that is
//! never held across an `.await`. Driver I/O (open, validate, reset, close)
//! happens on slots that have been taken out of the shared state; counters for
//! each in-flight category (`creating`, `validating`, `in_use`, `closing`)
//! keep `size` equal to the number of physical connections the pool is
//! responsible for.
//!
//! Waiters are served strictly in arrival order. A released slot, or the
//! capacity freed by a discarded one, is handed directly to the oldest waiter
//! through a oneshot channel while the lock is held.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use ora_client::{Config, Driver, DriverError, DriverErrorKind, Error, RawConnection, Result, SessionState};
use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::backoff::BackoffStrategy;
use crate::config::PoolConfig;
use crate::lifecycle::{
    ConnectionLifecycle, HealthCheckResult, OracleLifecycle, SlotMetadata, SlotState,
};

/// One physical connection plus its bookkeeping.
pub(crate) struct Slot {
    pub(crate) conn: Box<dyn RawConnection>,
    pub(crate) meta: SlotMetadata,
}

impl Slot {
    fn checked_out(&mut self) {
        self.meta.state = SlotState::InUse;
        self.meta.use_count += 1;
        self.meta.last_used = Instant::now();
    }
}

/// What a waiter receives.
pub(crate) enum Grant {
    /// A ready connection, already counted as in use.
    Slot(Slot),
    /// Permission to open a new connection, already counted as creating.
    Create,
}

struct Waiter {
    id: u64,
    tx: oneshot::Sender<Grant>,
}

/// Shared bookkeeping. Every method runs under the pool lock.
#[derive(Default)]
pub(crate) struct PoolState {
    pub(crate) idle: VecDeque<Slot>,
    waiters: VecDeque<Waiter>,
    /// Physical connections the pool is responsible for, including ones being
    /// opened or closed.
    pub(crate) size: u32,
    pub(crate) in_use: u32,
    pub(crate) validating: u32,
    pub(crate) creating: u32,
    pub(crate) closing: u32,
    pub(crate) closed: bool,
}

impl PoolState {
    /// Idle slot validated most recently.
    pub(crate) fn take_idle(&mut self) -> Option<Slot> {
        let index = self
            .idle
            .iter()
            .enumerate()
            .max_by_key(|(_, slot)| slot.meta.last_validated)
            .map(|(i, _)| i)?;
        self.idle.remove(index)
    }

    /// Try to deliver `grant` to the oldest live waiter; returns it if nobody
    /// took it.
    fn offer(&mut self, mut grant: Grant) -> Option<Grant> {
        while let Some(waiter) = self.waiters.pop_front() {
            match waiter.tx.send(grant) {
                Ok(()) => return None,
                Err(returned) => grant = returned,
            }
        }
        Some(grant)
    }

    /// Return a slot counted as in use: to the next waiter, or to idle.
    ///
    /// Returns the slot back when the pool has shut down; the caller must
    /// close it and call [`PoolState::slot_destroyed`].
    pub(crate) fn check_in(&mut self, mut slot: Slot) -> Option<Slot> {
        slot.meta.last_used = Instant::now();
        self.hand_off(slot)
    }

    /// Return a slot that passed an idle validation. Unlike
    /// [`PoolState::check_in`] this leaves `last_used` alone, so the idle
    /// clock keeps running.
    ///
    /// Returns the slot, counted as in use, when the pool has shut down.
    pub(crate) fn return_idle(&mut self, slot: Slot) -> Option<Slot> {
        self.validating = self.validating.saturating_sub(1);
        self.in_use += 1;
        self.hand_off(slot)
    }

    fn hand_off(&mut self, mut slot: Slot) -> Option<Slot> {
        if self.closed {
            return Some(slot);
        }
        slot.meta.state = SlotState::InUse;
        if let Some(Grant::Slot(mut slot)) = self.offer(Grant::Slot(slot)) {
            self.in_use = self.in_use.saturating_sub(1);
            slot.meta.state = SlotState::Idle;
            self.idle.push_back(slot);
        }
        None
    }

    /// One unit of capacity was freed: pass it to the next waiter as a
    /// creation permit, or shrink.
    pub(crate) fn free_capacity(&mut self) {
        if self.offer(Grant::Create).is_some() {
            self.size = self.size.saturating_sub(1);
        } else {
            self.creating += 1;
        }
    }

    /// A slot counted under `from` was destroyed.
    pub(crate) fn slot_destroyed(&mut self, from: Category) {
        match from {
            Category::InUse => self.in_use = self.in_use.saturating_sub(1),
            Category::Validating => self.validating = self.validating.saturating_sub(1),
            Category::Creating => self.creating = self.creating.saturating_sub(1),
            Category::Closing => self.closing = self.closing.saturating_sub(1),
        }
        self.free_capacity();
    }

    fn return_grant(&mut self, grant: Grant) {
        match grant {
            Grant::Slot(slot) => {
                if self.hand_off(slot).is_some() {
                    // Closed while the grant was in flight; no runtime context
                    // to close it here, so just drop it.
                    self.slot_destroyed(Category::InUse);
                }
            }
            Grant::Create => self.slot_destroyed(Category::Creating),
        }
    }

    fn remove_waiter(&mut self, id: u64) -> bool {
        match self.waiters.iter().position(|w| w.id == id) {
            Some(index) => {
                self.waiters.remove(index);
                true
            }
            None => false,
        }
    }

    /// Slots that have not come back yet.
    pub(crate) fn outstanding(&self) -> u32 {
        self.in_use + self.validating + self.creating
    }
}

/// Accounting category of an in-flight slot.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Category {
    InUse,
    Validating,
    Creating,
    Closing,
}

pub(crate) struct PoolInner {
    /// Pool configuration.
    pub(crate) config: PoolConfig,

    /// Connection configuration handed to the driver.
    connection_config: Config,

    driver: Arc<dyn Driver>,
    lifecycle: Arc<dyn ConnectionLifecycle>,

    pub(crate) state: Mutex<PoolState>,

    /// Set once by shutdown.
    closed: AtomicBool,

    /// Set when the drain window elapsed with connections still out.
    revoked: AtomicBool,

    /// Counter for generating slot ids.
    next_slot_id: AtomicU64,

    next_waiter_id: AtomicU64,

    /// Start of the pool's uptime.
    created_at: Instant,

    /// Pool metrics.
    pub(crate) metrics: Mutex<PoolMetricsInner>,

    /// Signalled whenever an outstanding slot settles after shutdown began.
    drained: Notify,

    pub(crate) sweeper: Mutex<Option<JoinHandle<()>>>,
}

/// Counters behind [`PoolMetrics`].
#[derive(Debug, Default)]
pub(crate) struct PoolMetricsInner {
    pub(crate) connections_created: u64,
    pub(crate) connections_closed: u64,
    pub(crate) connect_failures: u64,
    pub(crate) checkouts_successful: u64,
    pub(crate) checkouts_failed: u64,
    pub(crate) waits: u64,
    pub(crate) health_checks_performed: u64,
    pub(crate) health_checks_failed: u64,
    pub(crate) resets_performed: u64,
    pub(crate) resets_failed: u64,
    pub(crate) idle_evictions: u64,
    pub(crate) lifetime_expirations: u64,
}

/// Releases a creation reservation if the creating future is dropped or fails.
pub(crate) struct Reservation<'a> {
    pool: &'a PoolInner,
    armed: bool,
}

impl<'a> Reservation<'a> {
    pub(crate) fn new(pool: &'a PoolInner) -> Self {
        Self { pool, armed: true }
    }

    /// Move the new slot from `creating` to `in_use`.
    pub(crate) fn complete(mut self, mut slot: Slot) -> Slot {
        self.armed = false;
        {
            let mut state = self.pool.state.lock();
            state.creating = state.creating.saturating_sub(1);
            state.in_use += 1;
        }
        slot.checked_out();
        slot
    }

    /// Move the new slot from `creating` straight to idle, or to a waiter.
    /// Returns it, counted as in use, if the pool closed meanwhile.
    pub(crate) fn into_idle(mut self, slot: Slot) -> Option<Slot> {
        self.armed = false;
        let mut state = self.pool.state.lock();
        state.creating = state.creating.saturating_sub(1);
        state.in_use += 1;
        state.check_in(slot)
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.pool.state.lock().slot_destroyed(Category::Creating);
            self.pool.notify_if_closed();
        }
    }
}

/// Owns a slot taken out of idle for probing.
pub(crate) struct Probing<'a> {
    pool: &'a PoolInner,
    slot: Option<Slot>,
}

impl<'a> Probing<'a> {
    /// Wrap a slot already counted as validating.
    pub(crate) fn new(pool: &'a PoolInner, mut slot: Slot) -> Self {
        slot.meta.state = SlotState::Validating;
        Self {
            pool,
            slot: Some(slot),
        }
    }

    pub(crate) fn slot_mut(&mut self) -> Option<&mut Slot> {
        self.slot.as_mut()
    }

    /// Move the slot from `validating` to `in_use`.
    pub(crate) fn into_in_use(mut self) -> Option<Slot> {
        let mut slot = self.slot.take()?;
        {
            let mut state = self.pool.state.lock();
            state.validating = state.validating.saturating_sub(1);
            state.in_use += 1;
        }
        slot.checked_out();
        Some(slot)
    }

    /// Put a validated slot back into circulation without counting a
    /// checkout. Returns the slot, counted as in use, if the pool closed.
    pub(crate) fn into_idle(mut self) -> Option<Slot> {
        let slot = self.slot.take()?;
        self.pool.state.lock().return_idle(slot)
    }

    /// Take the slot for closing; it is counted as `closing` until
    /// [`PoolInner::finish_close`].
    pub(crate) fn into_closing(mut self) -> Option<Slot> {
        let slot = self.slot.take()?;
        let mut state = self.pool.state.lock();
        state.validating = state.validating.saturating_sub(1);
        state.closing += 1;
        Some(slot)
    }
}

impl Drop for Probing<'_> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            tracing::debug!(
                slot_id = slot.meta.id,
                "validation interrupted; dropping connection"
            );
            self.pool.state.lock().slot_destroyed(Category::Validating);
            self.pool.notify_if_closed();
        }
    }
}

/// Owns a slot across the awaits of a release or close. Dropping it while it
/// still holds the slot gives the slot's capacity back.
struct Settling<'a> {
    pool: &'a PoolInner,
    slot: Option<Slot>,
    from: Category,
}

impl<'a> Settling<'a> {
    fn new(pool: &'a PoolInner, slot: Slot, from: Category) -> Self {
        Self {
            pool,
            slot: Some(slot),
            from,
        }
    }

    fn slot_mut(&mut self) -> Option<&mut Slot> {
        self.slot.as_mut()
    }

    /// Take the slot back, still counted under its category.
    fn into_slot(mut self) -> Option<Slot> {
        self.slot.take()
    }
}

impl Drop for Settling<'_> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            drop(slot);
            self.pool.state.lock().slot_destroyed(self.from);
            self.pool.notify_if_closed();
        }
    }
}

/// A queued acquisition. Dropping it removes the waiter or returns a grant
/// that raced with the drop.
struct WaitTicket<'a> {
    pool: &'a PoolInner,
    id: u64,
    rx: oneshot::Receiver<Grant>,
    settled: bool,
}

impl Drop for WaitTicket<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.pool.state.lock();
        if !state.remove_waiter(self.id) {
            // The grant was sent under the lock, so it is already in the channel.
            if let Ok(grant) = self.rx.try_recv() {
                state.return_grant(grant);
            }
        }
        drop(state);
        self.pool.notify_if_closed();
    }
}

enum Step<'a> {
    Idle(Probing<'a>),
    Create,
    Wait(WaitTicket<'a>),
}

impl PoolInner {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn notify_if_closed(&self) {
        if self.is_closed() {
            self.drained.notify_one();
        }
    }

    fn enqueue(&self, state: &mut PoolState) -> WaitTicket<'_> {
        let id = self.next_waiter_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        state.waiters.push_back(Waiter { id, tx });
        WaitTicket {
            pool: self,
            id,
            rx,
            settled: false,
        }
    }

    async fn acquire(&self, deadline: Instant, timeout: Duration) -> Result<Slot> {
        loop {
            let step = {
                let mut state = self.state.lock();
                // Shutdown drains the waiter queue under this lock, so a
                // waiter queued after it would never be woken.
                if state.closed || self.is_closed() {
                    return Err(Error::PoolClosed);
                }
                if !state.waiters.is_empty() {
                    Step::Wait(self.enqueue(&mut state))
                } else if let Some(slot) = state.take_idle() {
                    state.validating += 1;
                    Step::Idle(Probing::new(self, slot))
                } else if state.size < self.config.max_connections {
                    state.size += 1;
                    state.creating += 1;
                    Step::Create
                } else {
                    Step::Wait(self.enqueue(&mut state))
                }
            };

            match step {
                Step::Idle(probing) => {
                    if let Some(slot) = self.check_idle(probing, deadline).await {
                        return Ok(slot);
                    }
                }
                Step::Create => return self.create_checked_out(deadline, timeout).await,
                Step::Wait(ticket) => match self.wait(ticket, deadline, timeout).await? {
                    Grant::Slot(mut slot) => {
                        slot.checked_out();
                        return Ok(slot);
                    }
                    Grant::Create => return self.create_checked_out(deadline, timeout).await,
                },
            }
        }
    }

    async fn wait(
        &self,
        mut ticket: WaitTicket<'_>,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<Grant> {
        self.metrics.lock().waits += 1;
        tracing::trace!(waiter = ticket.id, "pool at capacity; waiting for a connection");

        match tokio::time::timeout_at(deadline, &mut ticket.rx).await {
            Ok(Ok(grant)) => {
                ticket.settled = true;
                Ok(grant)
            }
            Ok(Err(_)) => {
                ticket.settled = true;
                Err(Error::PoolClosed)
            }
            Err(_) => {
                drop(ticket);
                Err(Error::PoolExhausted { timeout })
            }
        }
    }

    /// Retire, validate or hand out an idle slot. `None` means it was
    /// discarded and the caller should try again.
    async fn check_idle(&self, mut probing: Probing<'_>, deadline: Instant) -> Option<Slot> {
        let (expired, needs_validation, id) = {
            let slot = probing.slot_mut()?;
            (
                slot.meta.is_expired(self.config.max_lifetime),
                slot.meta.needs_validation(self.config.validation_interval),
                slot.meta.id,
            )
        };

        if expired {
            self.metrics.lock().lifetime_expirations += 1;
            let slot = probing.into_closing()?;
            self.finish_close(slot, "max lifetime reached").await;
            return None;
        }

        if needs_validation {
            let result = {
                let slot = probing.slot_mut()?;
                self.probe(&mut *slot.conn, Some(deadline)).await
            };
            match result {
                HealthCheckResult::Healthy { .. } => {
                    if let Some(slot) = probing.slot_mut() {
                        slot.meta.last_validated = Instant::now();
                    }
                }
                HealthCheckResult::Unhealthy { error, attempts } => {
                    tracing::warn!(
                        slot_id = id,
                        attempts,
                        error = %error,
                        "idle connection failed validation; evicting"
                    );
                    let slot = probing.into_closing()?;
                    self.finish_close(slot, "validation failed").await;
                    return None;
                }
            }
        }

        if self.is_closed() {
            let slot = probing.into_closing()?;
            self.finish_close(slot, "pool closed").await;
            return None;
        }

        let slot = probing.into_in_use()?;
        tracing::trace!(slot_id = id, "connection checked out");
        Some(slot)
    }

    async fn create_checked_out(&self, deadline: Instant, timeout: Duration) -> Result<Slot> {
        let reservation = Reservation::new(self);
        let slot = self.open_slot(Some((deadline, timeout))).await?;

        if self.is_closed() {
            let slot = reservation.complete(slot);
            self.close_in_use(slot, "pool closed").await;
            return Err(Error::PoolClosed);
        }

        let slot = reservation.complete(slot);
        tracing::trace!(slot_id = slot.meta.id, "new connection checked out");
        Ok(slot)
    }

    /// Open, initialize and validate a new physical connection.
    ///
    /// `budget` is the caller's acquire deadline; running out of it reports
    /// [`Error::PoolExhausted`] rather than a connect failure.
    pub(crate) async fn open_slot(&self, budget: Option<(Instant, Duration)>) -> Result<Slot> {
        let id = self.next_slot_id.fetch_add(1, Ordering::Relaxed);
        let connect_deadline = Instant::now() + self.connection_config.connect_timeout;
        let (limit, caller_bound) = match budget {
            Some((deadline, _)) if deadline < connect_deadline => (deadline, true),
            _ => (connect_deadline, false),
        };

        let opened =
            tokio::time::timeout_at(limit, self.driver.open(&self.connection_config)).await;
        let mut conn = match opened {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                self.metrics.lock().connect_failures += 1;
                tracing::warn!(
                    slot_id = id,
                    address = %self.connection_config.address(),
                    error = %e,
                    "failed to open connection"
                );
                return Err(Error::ConnectFailed(e));
            }
            Err(_) => {
                self.metrics.lock().connect_failures += 1;
                return Err(match budget {
                    Some((_, timeout)) if caller_bound => Error::PoolExhausted { timeout },
                    _ => Error::ConnectFailed(DriverError::new(
                        DriverErrorKind::Timeout,
                        format!(
                            "connect timed out after {:?}",
                            self.connection_config.connect_timeout
                        ),
                    )),
                });
            }
        };

        let init = tokio::time::timeout_at(limit, self.lifecycle.on_connect(&mut *conn)).await;
        let init_error = match init {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(_) => Some(DriverError::new(
                DriverErrorKind::Timeout,
                "session initialization timed out",
            )),
        };
        if let Some(e) = init_error {
            tracing::warn!(slot_id = id, error = %e, "session initialization failed");
            self.metrics.lock().connect_failures += 1;
            let _ = conn.close().await;
            return Err(Error::ConnectFailed(e));
        }

        if let HealthCheckResult::Unhealthy { error, .. } =
            self.probe(&mut *conn, budget.map(|(d, _)| d)).await
        {
            tracing::warn!(slot_id = id, error = %error, "new connection failed validation");
            self.metrics.lock().connect_failures += 1;
            let _ = conn.close().await;
            return Err(Error::ConnectFailed(error));
        }

        self.metrics.lock().connections_created += 1;
        tracing::debug!(slot_id = id, driver = self.driver.name(), "connection opened");

        Ok(Slot {
            conn,
            meta: SlotMetadata::new(id),
        })
    }

    /// Run the lifecycle probe with timeout and bounded transient retries.
    pub(crate) async fn probe(
        &self,
        conn: &mut dyn RawConnection,
        deadline: Option<Instant>,
    ) -> HealthCheckResult {
        let backoff: &BackoffStrategy = &self.config.retry_backoff;
        let mut attempts = 0;

        let result = loop {
            attempts += 1;
            let started = Instant::now();
            let mut limit = started + self.config.validation_timeout;
            if let Some(deadline) = deadline {
                limit = limit.min(deadline);
            }

            let outcome =
                match tokio::time::timeout_at(limit, self.lifecycle.validate(&mut *conn)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(DriverError::new(
                        DriverErrorKind::Timeout,
                        "validation timed out",
                    )),
                };

            match outcome {
                Ok(()) => {
                    break HealthCheckResult::Healthy {
                        latency: started.elapsed(),
                        attempts,
                    };
                }
                Err(error) => {
                    let retryable = error.kind() == DriverErrorKind::Transient
                        && attempts <= self.config.validation_retries;
                    if retryable {
                        let delay = backoff.delay(attempts - 1);
                        if deadline.is_none_or(|d| Instant::now() + delay < d) {
                            tracing::debug!(
                                attempts,
                                delay_ms = delay.as_millis() as u64,
                                error = %error,
                                "transient validation failure; retrying"
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    }
                    break HealthCheckResult::Unhealthy { error, attempts };
                }
            }
        };

        let mut metrics = self.metrics.lock();
        metrics.health_checks_performed += 1;
        if !result.is_healthy() {
            metrics.health_checks_failed += 1;
        }
        result
    }

    /// Close the connection held by `settling`, bounded by the validation
    /// timeout. Capacity is released when the guard drops.
    async fn close_conn(&self, mut settling: Settling<'_>, reason: &'static str) {
        let Some(slot) = settling.slot_mut() else {
            return;
        };
        slot.meta.state = SlotState::Closed;
        let id = slot.meta.id;
        let uses = slot.meta.use_count;
        match tokio::time::timeout(self.config.validation_timeout, slot.conn.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(slot_id = id, error = %e, "error closing connection");
            }
            Err(_) => {
                tracing::debug!(slot_id = id, "timed out closing connection");
            }
        }
        self.metrics.lock().connections_closed += 1;
        tracing::debug!(slot_id = id, uses, reason, "connection closed");
    }

    /// Close a slot counted as `closing` and release its capacity.
    pub(crate) async fn finish_close(&self, slot: Slot, reason: &'static str) {
        self.close_conn(Settling::new(self, slot, Category::Closing), reason).await;
    }

    /// Close a slot counted as `in_use` and release its capacity.
    pub(crate) async fn close_in_use(&self, slot: Slot, reason: &'static str) {
        self.close_conn(Settling::new(self, slot, Category::InUse), reason).await;
    }

    /// Put a slot counted as `in_use` back into circulation.
    async fn check_in(&self, slot: Slot) {
        let leftover = self.state.lock().check_in(slot);
        if let Some(slot) = leftover {
            self.close_in_use(slot, "pool closed").await;
        }
    }

    /// Roll back a dirty session. Returns `false` if the session has to go.
    async fn reset_session(&self, slot: &mut Slot) -> bool {
        let id = slot.meta.id;
        let reset = tokio::time::timeout(
            self.config.validation_timeout,
            self.lifecycle.reset(&mut *slot.conn),
        )
        .await;
        let mut metrics = self.metrics.lock();
        match reset {
            Ok(Ok(())) => {
                metrics.resets_performed += 1;
                true
            }
            Ok(Err(e)) => {
                metrics.resets_failed += 1;
                tracing::warn!(slot_id = id, error = %e, "session reset failed; discarding");
                false
            }
            Err(_) => {
                metrics.resets_failed += 1;
                tracing::warn!(slot_id = id, "session reset timed out; discarding");
                false
            }
        }
    }

    /// Return a checked-out slot.
    pub(crate) async fn release(&self, slot: Slot, mut broken: bool) {
        let id = slot.meta.id;
        let mut settling = Settling::new(self, slot, Category::InUse);

        if self.is_closed() {
            self.close_conn(settling, "pool closed").await;
            return;
        }

        if !broken && self.config.reset_on_release {
            if let Some(slot) = settling.slot_mut() {
                if slot.conn.session_state().is_dirty() {
                    broken = !self.reset_session(slot).await;
                }
            }
        }

        if broken {
            tracing::warn!(slot_id = id, "discarding broken connection");
            self.close_conn(settling, "broken").await;
            return;
        }

        let expired = settling
            .slot_mut()
            .is_some_and(|slot| slot.meta.is_expired(self.config.max_lifetime));
        if expired {
            self.metrics.lock().lifetime_expirations += 1;
            self.close_conn(settling, "max lifetime reached").await;
            return;
        }

        tracing::trace!(slot_id = id, "connection returned to pool");
        if let Some(slot) = settling.into_slot() {
            self.check_in(slot).await;
        }
    }

    /// Bookkeeping for a slot dropped outside a runtime.
    fn forget(&self, slot: Slot) {
        tracing::warn!(
            slot_id = slot.meta.id,
            "no async runtime; dropping connection without returning it to the pool"
        );
        drop(slot);
        self.state.lock().slot_destroyed(Category::InUse);
        self.notify_if_closed();
    }
}

/// A connection pool for Oracle.
///
/// The pool manages a bounded set of physical sessions opened through a
/// [`Driver`], providing reuse, health checking, recycling and graceful
/// shutdown. Cloning a `Pool` is cheap and yields a handle to the same pool.
///
/// # Example
///
/// ```rust,ignore
/// use ora_pool::{Pool, PoolConfig};
///
/// let pool = Pool::builder()
///     .driver(driver)
///     .connection_config(config)
///     .min_connections(2)
///     .max_connections(10)
///     .build()
///     .await?;
///
/// let conn = pool.acquire(Duration::from_secs(1)).await?;
/// // Use connection...
/// pool.release(conn).await;
/// ```
#[derive(Clone)]
pub struct Pool {
    pub(crate) inner: Arc<PoolInner>,
}

impl Pool {
    /// Start building a pool.
    #[must_use]
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    /// Create a pool with the default [`OracleLifecycle`] and warm it to the
    /// minimum size.
    ///
    /// Fails if any of the initial connections cannot be opened.
    pub async fn new(
        driver: Arc<dyn Driver>,
        connection_config: Config,
        config: PoolConfig,
    ) -> Result<Self> {
        let lifecycle = Arc::new(OracleLifecycle::new(
            config.validation_query.clone(),
            config.init_statements.clone(),
        ));
        Self::with_lifecycle(driver, connection_config, config, lifecycle).await
    }

    /// Create a pool with a custom lifecycle.
    pub async fn with_lifecycle(
        driver: Arc<dyn Driver>,
        connection_config: Config,
        config: PoolConfig,
        lifecycle: Arc<dyn ConnectionLifecycle>,
    ) -> Result<Self> {
        config.validate()?;
        connection_config.validate()?;

        let inner = Arc::new(PoolInner {
            config: config.clone(),
            connection_config,
            driver,
            lifecycle,
            state: Mutex::new(PoolState::default()),
            closed: AtomicBool::new(false),
            revoked: AtomicBool::new(false),
            next_slot_id: AtomicU64::new(1),
            next_waiter_id: AtomicU64::new(1),
            created_at: Instant::now(),
            metrics: Mutex::new(PoolMetricsInner::default()),
            drained: Notify::new(),
            sweeper: Mutex::new(None),
        });
        let pool = Self { inner };

        if let Err(e) = pool.ensure_min().await {
            pool.shutdown(Duration::ZERO).await;
            return Err(e);
        }

        if let Some(period) = config.sweep_interval {
            let handle = crate::maintenance::spawn_sweeper(&pool.inner, period);
            *pool.inner.sweeper.lock() = Some(handle);
        }

        tracing::info!(
            min = config.min_connections,
            max = config.max_connections,
            address = %pool.inner.connection_config.address(),
            "connection pool created"
        );

        Ok(pool)
    }

    /// Acquire a connection using the configured acquire timeout.
    pub async fn get(&self) -> Result<PooledConnection> {
        self.acquire(self.inner.config.acquire_timeout).await
    }

    /// Acquire a connection, waiting at most `timeout`.
    ///
    /// Idle connections are preferred (most recently validated first); a new
    /// connection is opened when below the maximum size; otherwise the caller
    /// queues in FIFO order. Fails with [`Error::PoolExhausted`] when the
    /// timeout elapses and with [`Error::PoolClosed`] after shutdown.
    pub async fn acquire(&self, timeout: Duration) -> Result<PooledConnection> {
        let deadline = Instant::now() + timeout;
        let result = self.inner.acquire(deadline, timeout).await;

        {
            let mut metrics = self.inner.metrics.lock();
            match &result {
                Ok(_) => metrics.checkouts_successful += 1,
                Err(_) => metrics.checkouts_failed += 1,
            }
        }

        result.map(|slot| PooledConnection::new(slot, Arc::clone(&self.inner)))
    }

    /// Return a connection to the pool.
    ///
    /// Broken connections are closed and the pool shrinks; a replacement is
    /// opened lazily by a later acquire. Dirty sessions are reset first.
    pub async fn release(&self, conn: PooledConnection) {
        conn.release().await;
    }

    /// Probe a checked-out connection.
    ///
    /// On failure the connection is marked broken and its state becomes
    /// [`SlotState::Closed`], and [`Error::ConnectionLost`] is returned. The
    /// caller still owns it; the session is closed and its capacity freed
    /// once it is released or dropped.
    pub async fn validate(&self, conn: &mut PooledConnection) -> Result<()> {
        let result = self.inner.probe(conn.raw()?, None).await;
        match result {
            HealthCheckResult::Healthy { .. } => {
                conn.mark_validated();
                Ok(())
            }
            HealthCheckResult::Unhealthy { error, .. } => {
                conn.mark_broken();
                Err(Error::ConnectionLost(error))
            }
        }
    }

    /// Close the pool.
    ///
    /// New acquisitions fail with [`Error::PoolClosed`] immediately, queued
    /// ones are woken with the same error, idle connections are closed, and
    /// checked-out connections get up to `drain_timeout` to come back. Any
    /// still out after that are revoked: further use fails with
    /// [`Error::PoolClosed`] and their session is closed on release.
    pub async fn shutdown(&self, drain_timeout: Duration) -> ShutdownReport {
        let inner = &self.inner;
        if inner.closed.swap(true, Ordering::AcqRel) {
            return ShutdownReport::default();
        }

        if let Some(handle) = inner.sweeper.lock().take() {
            handle.abort();
        }

        let (idle, waiters, outstanding) = {
            let mut state = inner.state.lock();
            state.closed = true;
            let idle: Vec<Slot> = state.idle.drain(..).collect();
            state.closing += idle.len() as u32;
            let waiters = std::mem::take(&mut state.waiters);
            (idle, waiters, state.outstanding())
        };
        // Dropping the senders wakes queued acquirers with PoolClosed.
        drop(waiters);

        let idle_closed = idle.len() as u32;
        for slot in idle {
            inner.finish_close(slot, "pool shutdown").await;
        }

        let deadline = Instant::now() + drain_timeout;
        loop {
            if inner.state.lock().outstanding() == 0 {
                break;
            }
            if tokio::time::timeout_at(deadline, inner.drained.notified())
                .await
                .is_err()
            {
                break;
            }
        }

        let remaining = inner.state.lock().outstanding();
        if remaining > 0 {
            inner.revoked.store(true, Ordering::Release);
            tracing::warn!(
                remaining,
                "drain timeout elapsed; revoking outstanding connections"
            );
        }

        let report = ShutdownReport {
            drained: outstanding.saturating_sub(remaining),
            forced: remaining,
            idle_closed,
        };
        tracing::info!(
            drained = report.drained,
            forced = report.forced,
            idle_closed = report.idle_closed,
            "connection pool shut down"
        );
        report
    }

    /// Whether [`Pool::shutdown`] has started.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// A snapshot of slot occupancy.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let state = self.inner.state.lock();
        PoolStatus {
            available: state.idle.len() as u32,
            in_use: state.in_use,
            validating: state.validating,
            creating: state.creating,
            total: state.size,
            max: self.inner.config.max_connections,
            waiting: state.waiters.len() as u32,
        }
    }

    /// Cumulative counters since the pool was created.
    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        let inner = self.inner.metrics.lock();
        PoolMetrics {
            connections_created: inner.connections_created,
            connections_closed: inner.connections_closed,
            connect_failures: inner.connect_failures,
            checkouts_successful: inner.checkouts_successful,
            checkouts_failed: inner.checkouts_failed,
            waits: inner.waits,
            health_checks_performed: inner.health_checks_performed,
            health_checks_failed: inner.health_checks_failed,
            resets_performed: inner.resets_performed,
            resets_failed: inner.resets_failed,
            idle_evictions: inner.idle_evictions,
            lifetime_expirations: inner.lifetime_expirations,
            uptime: self.inner.created_at.elapsed(),
        }
    }

    /// The configuration the pool was built with.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("address", &self.inner.connection_config.address())
            .field("status", &self.status())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Step-by-step construction of a [`Pool`].
///
/// # Example
///
/// ```rust,ignore
/// let pool = Pool::builder()
///     .driver(driver)
///     .connection_config(Config::from_connection_string("scott/tiger@db/ORCL")?)
///     .max_connections(20)
///     .build()
///     .await?;
/// ```
pub struct PoolBuilder {
    pool_config: PoolConfig,
    connection_config: Option<Config>,
    driver: Option<Arc<dyn Driver>>,
    lifecycle: Option<Arc<dyn ConnectionLifecycle>>,
}

impl PoolBuilder {
    /// A builder holding the default [`PoolConfig`] and no driver.
    pub fn new() -> Self {
        Self {
            pool_config: PoolConfig::default(),
            connection_config: None,
            driver: None,
            lifecycle: None,
        }
    }

    /// Set the driver used to open sessions.
    #[must_use]
    pub fn driver(mut self, driver: Arc<dyn Driver>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Set the connection configuration.
    #[must_use]
    pub fn connection_config(mut self, config: Config) -> Self {
        self.connection_config = Some(config);
        self
    }

    /// Replace the whole pool configuration.
    #[must_use]
    pub fn pool_config(mut self, config: PoolConfig) -> Self {
        self.pool_config = config;
        self
    }

    /// Use a custom connection lifecycle.
    #[must_use]
    pub fn lifecycle(mut self, lifecycle: Arc<dyn ConnectionLifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Sessions kept open once warmed.
    #[must_use]
    pub fn min_connections(mut self, count: u32) -> Self {
        self.pool_config.min_connections = count;
        self
    }

    /// Upper bound on physical sessions.
    #[must_use]
    pub fn max_connections(mut self, count: u32) -> Self {
        self.pool_config.max_connections = count;
        self
    }

    /// Set the default acquire timeout.
    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.pool_config.acquire_timeout = timeout;
        self
    }

    /// How long a surplus idle session may sit unused.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_config.idle_timeout = timeout;
        self
    }

    /// Set or disable the maintenance sweep period.
    #[must_use]
    pub fn sweep_interval(mut self, interval: Option<Duration>) -> Self {
        self.pool_config.sweep_interval = interval;
        self
    }

    /// Enable or disable session reset on release.
    #[must_use]
    pub fn reset_on_release(mut self, enabled: bool) -> Self {
        self.pool_config.reset_on_release = enabled;
        self
    }

    /// Build the pool.
    pub async fn build(self) -> Result<Pool> {
        let driver = self
            .driver
            .ok_or_else(|| Error::Config("a driver is required".into()))?;
        let connection_config = self
            .connection_config
            .ok_or_else(|| Error::Config("a connection configuration is required".into()))?;

        match self.lifecycle {
            Some(lifecycle) => {
                Pool::with_lifecycle(driver, connection_config, self.pool_config, lifecycle).await
            }
            None => Pool::new(driver, connection_config, self.pool_config).await,
        }
    }
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Slot occupancy at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Idle sessions ready to hand out.
    pub available: u32,
    /// Number of connections currently checked out.
    pub in_use: u32,
    /// Number of idle connections being probed.
    pub validating: u32,
    /// Number of connections being opened.
    pub creating: u32,
    /// Every slot, whatever its state.
    pub total: u32,
    /// Configured upper bound.
    pub max: u32,
    /// Callers queued for a connection.
    pub waiting: u32,
}

impl PoolStatus {
    /// Checked-out sessions as a percentage of `max`.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.max == 0 {
            0.0
        } else {
            f64::from(self.in_use) * 100.0 / f64::from(self.max)
        }
    }

    /// Whether no further session may be opened.
    #[must_use]
    pub fn is_at_capacity(&self) -> bool {
        self.total >= self.max
    }
}

/// Cumulative pool counters.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    /// Sessions opened.
    pub connections_created: u64,
    /// Sessions closed by the pool.
    pub connections_closed: u64,
    /// Attempts to open a connection that failed.
    pub connect_failures: u64,
    /// Acquisitions that returned a connection.
    pub checkouts_successful: u64,
    /// Acquisitions that failed: timed out, closed pool or connect error.
    pub checkouts_failed: u64,
    /// Checkouts that had to queue.
    pub waits: u64,
    /// Validation probes run.
    pub health_checks_performed: u64,
    /// Probes that ended unhealthy after retries.
    pub health_checks_failed: u64,
    /// Session resets performed.
    pub resets_performed: u64,
    /// Session resets that failed.
    pub resets_failed: u64,
    /// Idle connections closed by the sweep.
    pub idle_evictions: u64,
    /// Connections retired for exceeding their maximum lifetime.
    pub lifetime_expirations: u64,
    /// Time since the pool was created.
    pub uptime: Duration,
}

impl PoolMetrics {
    /// Share of acquisitions that succeeded, in `[0, 1]`.
    #[must_use]
    pub fn checkout_success_rate(&self) -> f64 {
        match self.checkouts_successful + self.checkouts_failed {
            0 => 1.0,
            attempts => self.checkouts_successful as f64 / attempts as f64,
        }
    }

    /// Share of probes that passed, in `[0, 1]`.
    #[must_use]
    pub fn health_check_success_rate(&self) -> f64 {
        match self.health_checks_performed {
            0 => 1.0,
            probes => probes.saturating_sub(self.health_checks_failed) as f64 / probes as f64,
        }
    }
}

/// Outcome of [`Pool::shutdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Checked-out connections that came back within the drain window.
    pub drained: u32,
    /// Connections still out when the drain window elapsed (now revoked).
    pub forced: u32,
    /// Idle connections closed immediately.
    pub idle_closed: u32,
}

/// A connection checked out of the pool.
///
/// Return it with [`PooledConnection::release`] (or [`Pool::release`]). If it
/// is dropped instead, the release runs on a spawned task.
pub struct PooledConnection {
    conn: Option<Box<dyn RawConnection>>,
    meta: SlotMetadata,
    broken: bool,
    pool: Arc<PoolInner>,
}

impl PooledConnection {
    fn new(slot: Slot, pool: Arc<PoolInner>) -> Self {
        Self {
            conn: Some(slot.conn),
            meta: slot.meta,
            broken: false,
            pool,
        }
    }

    /// Unique id of the underlying slot.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.meta.id
    }

    /// Get the slot metadata.
    #[must_use]
    pub fn metadata(&self) -> &SlotMetadata {
        &self.meta
    }

    /// Borrow the physical session.
    ///
    /// Fails with [`Error::PoolClosed`] once the pool has revoked outstanding
    /// connections.
    pub fn raw(&mut self) -> Result<&mut (dyn RawConnection + 'static)> {
        if self.pool.revoked.load(Ordering::Acquire) {
            return Err(Error::PoolClosed);
        }
        self.conn.as_deref_mut().ok_or(Error::PoolClosed)
    }

    /// Current session state as reported by the driver.
    #[must_use]
    pub fn session_state(&self) -> SessionState {
        self.conn
            .as_deref()
            .map(|conn| conn.session_state())
            .unwrap_or_default()
    }

    /// Flag the connection so it is discarded on release. Its state reads
    /// [`SlotState::Closed`] from here on.
    pub fn mark_broken(&mut self) {
        self.broken = true;
        self.meta.state = SlotState::Closed;
    }

    /// Whether the connection has been flagged as broken.
    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Record that the session just proved healthy (a successful round trip
    /// counts as validation).
    pub fn mark_validated(&mut self) {
        self.meta.last_validated = Instant::now();
    }

    /// Return the connection to its pool.
    pub async fn release(mut self) {
        if let Some(conn) = self.conn.take() {
            let slot = Slot {
                conn,
                meta: self.meta.clone(),
            };
            self.pool.release(slot, self.broken).await;
        }
    }

    /// Take the session out of the pool for good.
    ///
    /// The pool forgets the session (freeing its capacity) and the caller
    /// becomes responsible for closing it.
    pub fn detach(mut self) -> Option<Box<dyn RawConnection>> {
        let conn = self.conn.take()?;
        self.pool.state.lock().slot_destroyed(Category::InUse);
        self.pool.notify_if_closed();
        tracing::debug!(slot_id = self.meta.id, "connection detached from pool");
        Some(conn)
    }
}

impl fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.meta.id)
            .field("use_count", &self.meta.use_count)
            .field("broken", &self.broken)
            .finish()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        let slot = Slot {
            conn,
            meta: self.meta.clone(),
        };
        let broken = self.broken;
        let pool = Arc::clone(&self.pool);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::trace!(slot_id = self.meta.id, "returning dropped connection to pool");
                handle.spawn(async move {
                    pool.release(slot, broken).await;
                });
            }
            Err(_) => pool.forget(slot),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn status(in_use: u32, total: u32, max: u32) -> PoolStatus {
        PoolStatus {
            available: total - in_use,
            in_use,
            validating: 0,
            creating: 0,
            total,
            max,
            waiting: 0,
        }
    }

    #[test]
    fn test_status_ratios() {
        let half = status(4, 6, 8);
        assert!((half.utilization() - 50.0).abs() < f64::EPSILON);
        assert!(!half.is_at_capacity());
        assert!(status(3, 3, 3).is_at_capacity());
        assert!(status(0, 0, 0).utilization().abs() < f64::EPSILON);
    }

    #[test]
    fn test_metric_rates() {
        let mut metrics = PoolMetrics {
            connections_created: 3,
            connections_closed: 1,
            connect_failures: 1,
            checkouts_successful: 0,
            checkouts_failed: 0,
            waits: 0,
            health_checks_performed: 0,
            health_checks_failed: 0,
            resets_performed: 0,
            resets_failed: 0,
            idle_evictions: 0,
            lifetime_expirations: 0,
            uptime: Duration::from_secs(1),
        };
        assert!((metrics.checkout_success_rate() - 1.0).abs() < f64::EPSILON);
        assert!((metrics.health_check_success_rate() - 1.0).abs() < f64::EPSILON);

        metrics.checkouts_successful = 3;
        metrics.checkouts_failed = 1;
        metrics.health_checks_performed = 8;
        metrics.health_checks_failed = 2;
        assert!((metrics.checkout_success_rate() - 0.75).abs() < f64::EPSILON);
        assert!((metrics.health_check_success_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_free_capacity_shrinks_without_waiters() {
        let mut state = PoolState {
            size: 3,
            in_use: 1,
            ..PoolState::default()
        };
        state.slot_destroyed(Category::InUse);
        assert_eq!(state.size, 2);
        assert_eq!(state.in_use, 0);
        assert_eq!(state.creating, 0);
    }

    #[test]
    fn test_free_capacity_hands_permit_to_waiter() {
        let mut state = PoolState {
            size: 2,
            in_use: 2,
            ..PoolState::default()
        };
        let (tx, mut rx) = oneshot::channel();
        state.waiters.push_back(Waiter { id: 1, tx });

        state.slot_destroyed(Category::InUse);

        assert_eq!(state.size, 2);
        assert_eq!(state.in_use, 1);
        assert_eq!(state.creating, 1);
        assert!(matches!(rx.try_recv(), Ok(Grant::Create)));
    }

    #[test]
    fn test_offer_skips_abandoned_waiters() {
        let mut state = PoolState::default();
        let (gone_tx, gone_rx) = oneshot::channel();
        drop(gone_rx);
        let (live_tx, mut live_rx) = oneshot::channel();
        state.waiters.push_back(Waiter { id: 1, tx: gone_tx });
        state.waiters.push_back(Waiter { id: 2, tx: live_tx });

        assert!(state.offer(Grant::Create).is_none());
        assert!(matches!(live_rx.try_recv(), Ok(Grant::Create)));
        assert!(state.waiters.is_empty());
    }

    async fn mock_slot(id: u64) -> Slot {
        let driver = ora_testing::MockDriver::new();
        let conn = driver
            .arc()
            .open(&ora_testing::test_config())
            .await
            .unwrap();
        Slot {
            conn,
            meta: SlotMetadata::new(id),
        }
    }

    #[tokio::test]
    async fn test_return_idle_keeps_idle_clock() {
        let slot = mock_slot(1).await;
        let last_used = slot.meta.last_used;
        let mut state = PoolState {
            size: 1,
            validating: 1,
            ..PoolState::default()
        };

        assert!(state.return_idle(slot).is_none());

        assert_eq!((state.validating, state.in_use), (0, 0));
        let parked = &state.idle[0];
        assert_eq!(parked.meta.state, SlotState::Idle);
        assert_eq!(parked.meta.last_used, last_used);
        assert_eq!(parked.meta.use_count, 0);
    }

    #[tokio::test]
    async fn test_return_idle_hands_slot_to_waiter_unused() {
        let mut state = PoolState {
            size: 1,
            validating: 1,
            ..PoolState::default()
        };
        let (tx, mut rx) = oneshot::channel();
        state.waiters.push_back(Waiter { id: 1, tx });

        assert!(state.return_idle(mock_slot(1).await).is_none());

        assert_eq!((state.validating, state.in_use), (0, 1));
        assert!(state.idle.is_empty());
        match rx.try_recv() {
            Ok(Grant::Slot(slot)) => assert_eq!(slot.meta.use_count, 0),
            _ => panic!("waiter did not receive the slot"),
        }
    }

    #[tokio::test]
    async fn test_return_idle_after_close_gives_slot_back() {
        let mut state = PoolState {
            size: 1,
            validating: 1,
            closed: true,
            ..PoolState::default()
        };

        assert!(state.return_idle(mock_slot(1).await).is_some());
        assert_eq!((state.validating, state.in_use), (0, 1));
        assert!(state.idle.is_empty());
    }

    #[tokio::test]
    async fn test_acquire_sees_close_under_lock() {
        let driver = ora_testing::MockDriver::new();
        let config = PoolConfig::new()
            .min_connections(0)
            .max_connections(1)
            .sweep_interval(None);
        let pool = Pool::new(driver.arc(), ora_testing::test_config(), config)
            .await
            .unwrap();
        let held = pool.get().await.unwrap();

        // Shutdown has drained the waiter queue but the closed flag the
        // lock-free check reads is not visible yet.
        pool.inner.state.lock().closed = true;

        let started = Instant::now();
        let err = pool.acquire(Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, Error::PoolClosed));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(pool.inner.state.lock().waiters.is_empty());

        held.release().await;
        assert_eq!(driver.open_sessions(), 0);
    }

    #[test]
    fn test_builder_collects_settings() {
        let builder = Pool::builder()
            .min_connections(2)
            .max_connections(8)
            .reset_on_release(false);
        assert_eq!(
            (builder.pool_config.min_connections, builder.pool_config.max_connections),
            (2, 8)
        );
        assert!(!builder.pool_config.reset_on_release);
        assert!(builder.driver.is_none() && builder.connection_config.is_none());
    }
}
