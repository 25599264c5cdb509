//! Executor configuration.

use std::time::Duration;

use ora_client::Error;
use ora_client::instrumentation::SanitizationConfig;

/// Configuration for an [`Executor`](crate::Executor).
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Total budget for one execution (acquire plus run) when the caller
    /// does not pass one.
    pub statement_timeout: Duration,

    /// How long to wait for the driver to cancel a timed-out call before the
    /// connection is discarded.
    pub cancel_grace: Duration,

    /// Commit after every successful statement that leaves a transaction
    /// open; roll back after a failed one.
    pub autocommit: bool,

    /// How statements are sanitized before they reach logs and hooks.
    pub sanitization: SanitizationConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            statement_timeout: Duration::from_secs(30),
            cancel_grace: Duration::from_secs(2),
            autocommit: true,
            sanitization: SanitizationConfig::default(),
        }
    }
}

impl ExecutorConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the configuration for inconsistencies.
    pub fn validate(&self) -> Result<(), Error> {
        if self.statement_timeout.is_zero() {
            return Err(Error::Config("statement_timeout must be positive".into()));
        }
        if self.cancel_grace.is_zero() {
            return Err(Error::Config("cancel_grace must be positive".into()));
        }
        Ok(())
    }

    /// Set the default statement timeout.
    #[must_use]
    pub fn statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// Set the cancellation grace period.
    #[must_use]
    pub fn cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace = grace;
        self
    }

    /// Enable or disable autocommit.
    #[must_use]
    pub fn autocommit(mut self, enabled: bool) -> Self {
        self.autocommit = enabled;
        self
    }

    /// Set the statement sanitization used for logs and hooks.
    #[must_use]
    pub fn sanitization(mut self, sanitization: SanitizationConfig) -> Self {
        self.sanitization = sanitization;
        self
    }
}
