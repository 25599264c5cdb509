//! Metadata cache configuration.

use std::time::Duration;

use ora_client::Error;

/// Configuration for a [`MetadataCache`](crate::MetadataCache).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a fetched descriptor is served as fresh.
    pub ttl: Duration,
    /// Maximum number of schema entries and, separately, of table entries.
    /// The least recently used entry is evicted first.
    pub max_entries: usize,
    /// Budget for one catalog fetch, including acquiring a connection.
    pub fetch_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_entries: 1024,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl CacheConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the configuration for inconsistencies.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_entries == 0 {
            return Err(Error::Config("max_entries must be at least 1".into()));
        }
        if self.fetch_timeout.is_zero() {
            return Err(Error::Config("fetch_timeout must be positive".into()));
        }
        Ok(())
    }

    /// Set the time-to-live.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the entry bound.
    #[must_use]
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Set the fetch budget.
    #[must_use]
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}
