//! Pool configuration.

use std::time::Duration;

use ora_client::Error;

use crate::backoff::BackoffStrategy;

/// Default validation query.
pub const DEFAULT_VALIDATION_QUERY: &str = "SELECT 1 FROM DUAL";

/// Configuration for a connection pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Minimum number of connections kept open once warmed.
    pub min_connections: u32,

    /// Maximum number of connections.
    pub max_connections: u32,

    /// Default timeout for [`Pool::get`](crate::Pool::get).
    pub acquire_timeout: Duration,

    /// Idle connections unused for longer than this are closed by the sweep
    /// while the pool is above its minimum size.
    pub idle_timeout: Duration,

    /// Connections older than this are retired when they next become idle.
    pub max_lifetime: Option<Duration>,

    /// Query used to validate a connection. `None` uses the driver ping.
    pub validation_query: Option<String>,

    /// An idle connection last validated (or successfully used) longer ago
    /// than this is validated before it is handed out.
    pub validation_interval: Duration,

    /// Timeout for one validation probe.
    pub validation_timeout: Duration,

    /// Retries after a transient validation failure.
    pub validation_retries: u32,

    /// Delay between validation retries.
    pub retry_backoff: BackoffStrategy,

    /// Period of the background maintenance sweep. `None` disables it.
    pub sweep_interval: Option<Duration>,

    /// Roll back open transactions before a connection goes back to idle.
    pub reset_on_release: bool,

    /// Statements executed on every new session (e.g. `ALTER SESSION SET ...`).
    pub init_statements: Vec<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 1,
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Some(Duration::from_secs(30 * 60)),
            validation_query: Some(DEFAULT_VALIDATION_QUERY.to_string()),
            validation_interval: Duration::from_secs(30),
            validation_timeout: Duration::from_secs(5),
            validation_retries: 2,
            retry_backoff: BackoffStrategy::default(),
            sweep_interval: Some(Duration::from_secs(30)),
            reset_on_release: true,
            init_statements: Vec::new(),
        }
    }
}

impl PoolConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the configuration for inconsistencies.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_connections == 0 {
            return Err(Error::Config("max_connections must be at least 1".into()));
        }
        if self.min_connections > self.max_connections {
            return Err(Error::Config(format!(
                "min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        if self.acquire_timeout.is_zero() {
            return Err(Error::Config("acquire_timeout must be positive".into()));
        }
        if self.validation_timeout.is_zero() {
            return Err(Error::Config("validation_timeout must be positive".into()));
        }
        if self.sweep_interval.is_some_and(|d| d.is_zero()) {
            return Err(Error::Config("sweep_interval must be positive".into()));
        }
        if self
            .validation_query
            .as_deref()
            .is_some_and(|q| q.trim().is_empty())
        {
            return Err(Error::Config("validation_query must not be empty".into()));
        }
        Ok(())
    }

    /// Set the minimum number of connections.
    #[must_use]
    pub fn min_connections(mut self, count: u32) -> Self {
        self.min_connections = count;
        self
    }

    /// Set the maximum number of connections.
    #[must_use]
    pub fn max_connections(mut self, count: u32) -> Self {
        self.max_connections = count;
        self
    }

    /// Set the default acquire timeout.
    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the idle timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set or clear the maximum connection lifetime.
    #[must_use]
    pub fn max_lifetime(mut self, lifetime: Option<Duration>) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Set or clear the validation query.
    #[must_use]
    pub fn validation_query(mut self, query: Option<String>) -> Self {
        self.validation_query = query;
        self
    }

    /// Set the validation interval. `Duration::ZERO` validates on every
    /// checkout of an idle connection.
    #[must_use]
    pub fn validation_interval(mut self, interval: Duration) -> Self {
        self.validation_interval = interval;
        self
    }

    /// Set the validation probe timeout.
    #[must_use]
    pub fn validation_timeout(mut self, timeout: Duration) -> Self {
        self.validation_timeout = timeout;
        self
    }

    /// Set the number of retries after a transient validation failure.
    #[must_use]
    pub fn validation_retries(mut self, retries: u32) -> Self {
        self.validation_retries = retries;
        self
    }

    /// Set the retry backoff.
    #[must_use]
    pub fn retry_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Set or disable the maintenance sweep period.
    #[must_use]
    pub fn sweep_interval(mut self, interval: Option<Duration>) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Enable or disable session reset on release.
    #[must_use]
    pub fn reset_on_release(mut self, enabled: bool) -> Self {
        self.reset_on_release = enabled;
        self
    }

    /// Add a session initialization statement.
    #[must_use]
    pub fn init_statement(mut self, sql: impl Into<String>) -> Self {
        self.init_statements.push(sql.into());
        self
    }
}
