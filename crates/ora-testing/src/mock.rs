//! Scriptable in-memory driver.
//!
//! [`MockDriver`] opens [`MockConnection`]s that answer statements from a list
//! of rules. A rule matches when its pattern occurs (case-insensitively) in
//! the statement text; the most recently added matching rule wins. Statements
//! no rule matches return an empty result.
//!
//! The validation query `SELECT 1 FROM DUAL` and `ping` are answered by the
//! driver's health settings rather than by rules.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ora_client::instrumentation::{extract_operation, is_dml};
use ora_client::{
    ColumnInfo, Config, Driver, DriverError, RawConnection, RawRows, SessionState, SqlValue,
};
use parking_lot::Mutex;

/// The statement the mock treats as a validation probe.
pub const VALIDATION_SQL: &str = "SELECT 1 FROM DUAL";

/// Computes a response from the statement text and bind values.
pub type Handler = Arc<dyn Fn(&str, &[SqlValue]) -> MockResponse + Send + Sync>;

/// A scripted answer to a statement.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return this result.
    Rows(RawRows),
    /// Fail with this error.
    Error(DriverError),
    /// Sleep, then answer with the inner response.
    Delayed(Duration, Box<MockResponse>),
    /// Never complete.
    Hang,
}

impl MockResponse {
    /// A query result with `VARCHAR2` columns named `columns`.
    pub fn rows(columns: &[&str], rows: Vec<Vec<SqlValue>>) -> Self {
        let columns = columns
            .iter()
            .map(|name| ColumnInfo::new(*name, "VARCHAR2"))
            .collect();
        Self::Rows(RawRows::new(columns, rows))
    }

    /// A DML result.
    pub fn affected(rows: u64) -> Self {
        Self::Rows(RawRows::affected(rows))
    }

    /// A failure.
    pub fn error(error: DriverError) -> Self {
        Self::Error(error)
    }

    /// A failure with an `ORA-nnnnn` code, classified like a real driver would.
    pub fn ora_error(code: u32, message: &str) -> Self {
        Self::Error(DriverError::from_ora_code(code, message))
    }

    /// Delay this response.
    #[must_use]
    pub fn delayed(self, delay: Duration) -> Self {
        Self::Delayed(delay, Box::new(self))
    }
}

struct Rule {
    pattern: String,
    handler: Handler,
    remaining: Option<u32>,
}

#[derive(Default)]
struct Counters {
    opened: AtomicU64,
    closed: AtomicU64,
    open_sessions: AtomicU64,
    peak_sessions: AtomicU64,
    executions: AtomicU64,
    pings: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
    cancels: AtomicU64,
}

struct Shared {
    rules: Mutex<Vec<Rule>>,
    log: Mutex<Vec<String>>,
    connect_failures: Mutex<VecDeque<DriverError>>,
    connect_error: Mutex<Option<DriverError>>,
    connect_delay: Mutex<Duration>,
    validation_failures: Mutex<VecDeque<DriverError>>,
    healthy: AtomicBool,
    cancel_supported: AtomicBool,
    rollback_fails: AtomicBool,
    kill_generation: AtomicU64,
    next_session: AtomicU64,
    counters: Counters,
}

impl Shared {
    fn respond(&self, sql: &str, params: &[SqlValue]) -> MockResponse {
        let upper = sql.to_uppercase();
        let handler = {
            let mut rules = self.rules.lock();
            rules
                .iter_mut()
                .rev()
                .find(|rule| rule.remaining != Some(0) && upper.contains(&rule.pattern))
                .map(|rule| {
                    if let Some(n) = rule.remaining.as_mut() {
                        *n -= 1;
                    }
                    Arc::clone(&rule.handler)
                })
        };
        match handler {
            Some(handler) => handler(sql, params),
            None => MockResponse::Rows(RawRows::empty()),
        }
    }

    fn health(&self) -> Result<(), DriverError> {
        if let Some(error) = self.validation_failures.lock().pop_front() {
            return Err(error);
        }
        if !self.healthy.load(Ordering::SeqCst) {
            return Err(DriverError::from_ora_code(
                3113,
                "end-of-file on communication channel",
            ));
        }
        Ok(())
    }
}

/// In-memory [`Driver`] for tests.
///
/// Cloning yields a handle to the same driver, so a test can keep one clone
/// for scripting and assertions while the pool owns another.
#[derive(Clone)]
pub struct MockDriver {
    shared: Arc<Shared>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// A healthy driver with no rules.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                rules: Mutex::new(Vec::new()),
                log: Mutex::new(Vec::new()),
                connect_failures: Mutex::new(VecDeque::new()),
                connect_error: Mutex::new(None),
                connect_delay: Mutex::new(Duration::ZERO),
                validation_failures: Mutex::new(VecDeque::new()),
                healthy: AtomicBool::new(true),
                cancel_supported: AtomicBool::new(true),
                rollback_fails: AtomicBool::new(false),
                kill_generation: AtomicU64::new(0),
                next_session: AtomicU64::new(1),
                counters: Counters::default(),
            }),
        }
    }

    /// The driver as a trait object, ready to hand to a pool.
    pub fn arc(&self) -> Arc<dyn Driver> {
        Arc::new(self.clone())
    }

    fn add_rule(&self, pattern: &str, handler: Handler, remaining: Option<u32>) {
        self.shared.rules.lock().push(Rule {
            pattern: pattern.to_uppercase(),
            handler,
            remaining,
        });
    }

    /// Answer statements containing `pattern` with `response`.
    pub fn on(&self, pattern: &str, response: MockResponse) {
        self.add_rule(pattern, Arc::new(move |_, _| response.clone()), None);
    }

    /// Answer the next `times` statements containing `pattern` with `response`.
    pub fn on_times(&self, pattern: &str, times: u32, response: MockResponse) {
        self.add_rule(pattern, Arc::new(move |_, _| response.clone()), Some(times));
    }

    /// Answer the next statement containing `pattern` with `response`.
    pub fn on_once(&self, pattern: &str, response: MockResponse) {
        self.on_times(pattern, 1, response);
    }

    /// Answer statements containing `pattern` by calling `handler`.
    pub fn on_query<F>(&self, pattern: &str, handler: F)
    where
        F: Fn(&str, &[SqlValue]) -> MockResponse + Send + Sync + 'static,
    {
        self.add_rule(pattern, Arc::new(handler), None);
    }

    /// Fail the next `times` connection attempts with `error`.
    pub fn fail_next_connects(&self, times: usize, error: DriverError) {
        let mut failures = self.shared.connect_failures.lock();
        failures.extend(std::iter::repeat_n(error, times));
    }

    /// Fail every connection attempt with `error` until cleared.
    pub fn set_connect_error(&self, error: Option<DriverError>) {
        *self.shared.connect_error.lock() = error;
    }

    /// Delay every connection attempt.
    pub fn set_connect_delay(&self, delay: Duration) {
        *self.shared.connect_delay.lock() = delay;
    }

    /// Make validation probes and pings succeed or fail.
    pub fn set_healthy(&self, healthy: bool) {
        self.shared.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Fail the next `times` validation probes or pings with `error`.
    pub fn fail_next_validations(&self, times: usize, error: DriverError) {
        let mut failures = self.shared.validation_failures.lock();
        failures.extend(std::iter::repeat_n(error, times));
    }

    /// Make `cancel` succeed or fail.
    pub fn set_cancel_supported(&self, supported: bool) {
        self.shared.cancel_supported.store(supported, Ordering::SeqCst);
    }

    /// Make `rollback` fail.
    pub fn set_rollback_fails(&self, fails: bool) {
        self.shared.rollback_fails.store(fails, Ordering::SeqCst);
    }

    /// Kill every session open right now; their next call fails with
    /// `ORA-03113`. Sessions opened afterwards are unaffected.
    pub fn kill_sessions(&self) {
        self.shared.kill_generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Sessions opened so far.
    pub fn opened(&self) -> u64 {
        self.shared.counters.opened.load(Ordering::SeqCst)
    }

    /// Sessions closed through `close`.
    pub fn closed(&self) -> u64 {
        self.shared.counters.closed.load(Ordering::SeqCst)
    }

    /// Sessions currently open (neither closed nor dropped).
    pub fn open_sessions(&self) -> u64 {
        self.shared.counters.open_sessions.load(Ordering::SeqCst)
    }

    /// Highest number of sessions open at the same time.
    pub fn peak_sessions(&self) -> u64 {
        self.shared.counters.peak_sessions.load(Ordering::SeqCst)
    }

    /// Statements executed, including validation probes.
    pub fn executions(&self) -> u64 {
        self.shared.counters.executions.load(Ordering::SeqCst)
    }

    /// Pings served.
    pub fn pings(&self) -> u64 {
        self.shared.counters.pings.load(Ordering::SeqCst)
    }

    /// Commits served.
    pub fn commits(&self) -> u64 {
        self.shared.counters.commits.load(Ordering::SeqCst)
    }

    /// Rollbacks served.
    pub fn rollbacks(&self) -> u64 {
        self.shared.counters.rollbacks.load(Ordering::SeqCst)
    }

    /// Cancellations requested.
    pub fn cancels(&self) -> u64 {
        self.shared.counters.cancels.load(Ordering::SeqCst)
    }

    /// Every statement executed so far, in order.
    pub fn statements(&self) -> Vec<String> {
        self.shared.log.lock().clone()
    }

    /// Number of executed statements containing `pattern` (case-insensitive).
    pub fn count_statements(&self, pattern: &str) -> usize {
        let pattern = pattern.to_uppercase();
        self.shared
            .log
            .lock()
            .iter()
            .filter(|sql| sql.to_uppercase().contains(&pattern))
            .count()
    }

    /// Forget the statement log.
    pub fn clear_log(&self) {
        self.shared.log.lock().clear();
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn open(&self, _config: &Config) -> Result<Box<dyn RawConnection>, DriverError> {
        let delay = *self.shared.connect_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.shared.connect_failures.lock().pop_front() {
            return Err(error);
        }
        if let Some(error) = self.shared.connect_error.lock().clone() {
            return Err(error);
        }

        let counters = &self.shared.counters;
        counters.opened.fetch_add(1, Ordering::SeqCst);
        let open = counters.open_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        counters.peak_sessions.fetch_max(open, Ordering::SeqCst);

        let id = self.shared.next_session.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(session = id, "mock session opened");

        Ok(Box::new(MockConnection {
            id,
            generation: self.shared.kill_generation.load(Ordering::SeqCst),
            shared: Arc::clone(&self.shared),
            in_transaction: false,
            closed: false,
        }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A session opened by [`MockDriver`].
pub struct MockConnection {
    id: u64,
    generation: u64,
    shared: Arc<Shared>,
    in_transaction: bool,
    closed: bool,
}

impl MockConnection {
    /// Session id, unique per driver.
    pub fn id(&self) -> u64 {
        self.id
    }

    fn check_alive(&self) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::from_ora_code(1012, "not logged on"));
        }
        if self.generation < self.shared.kill_generation.load(Ordering::SeqCst) {
            return Err(DriverError::from_ora_code(
                3113,
                "end-of-file on communication channel",
            ));
        }
        Ok(())
    }

    fn mark_closed(&mut self) {
        if !self.closed {
            self.closed = true;
            self.shared.counters.open_sessions.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl RawConnection for MockConnection {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<RawRows, DriverError> {
        self.check_alive()?;
        self.shared.counters.executions.fetch_add(1, Ordering::SeqCst);
        self.shared.log.lock().push(sql.to_string());

        if sql.trim().eq_ignore_ascii_case(VALIDATION_SQL) {
            self.shared.health()?;
            return Ok(RawRows::new(
                vec![ColumnInfo::new("1", "NUMBER")],
                vec![vec![SqlValue::Int(1)]],
            ));
        }

        let mut response = self.shared.respond(sql, params);
        loop {
            match response {
                MockResponse::Rows(rows) => {
                    if is_dml(extract_operation(sql)) {
                        self.in_transaction = true;
                    }
                    return Ok(rows);
                }
                MockResponse::Error(error) => return Err(error),
                MockResponse::Delayed(delay, next) => {
                    tokio::time::sleep(delay).await;
                    response = *next;
                }
                MockResponse::Hang => std::future::pending::<()>().await,
            }
        }
    }

    async fn ping(&mut self) -> Result<(), DriverError> {
        self.check_alive()?;
        self.shared.counters.pings.fetch_add(1, Ordering::SeqCst);
        self.shared.health()
    }

    async fn commit(&mut self) -> Result<(), DriverError> {
        self.check_alive()?;
        self.shared.counters.commits.fetch_add(1, Ordering::SeqCst);
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DriverError> {
        self.check_alive()?;
        self.shared.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        if self.shared.rollback_fails.load(Ordering::SeqCst) {
            return Err(DriverError::from_ora_code(3114, "not connected to ORACLE"));
        }
        self.in_transaction = false;
        Ok(())
    }

    async fn cancel(&mut self) -> Result<(), DriverError> {
        self.shared.counters.cancels.fetch_add(1, Ordering::SeqCst);
        self.check_alive()?;
        if self.shared.cancel_supported.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DriverError::from_ora_code(
                3113,
                "end-of-file on communication channel",
            ))
        }
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if !self.closed {
            self.shared.counters.closed.fetch_add(1, Ordering::SeqCst);
            tracing::trace!(session = self.id, "mock session closed");
        }
        self.mark_closed();
        Ok(())
    }

    fn session_state(&self) -> SessionState {
        SessionState {
            in_transaction: self.in_transaction,
            open_cursors: 0,
        }
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.mark_closed();
    }
}
