//! Aggregate configuration for [`Database`](crate::Database).

use ora_client::{Config, Error};
use ora_metadata::CacheConfig;
use ora_pool::PoolConfig;
use ora_query::ExecutorConfig;

/// Everything needed to open a [`Database`](crate::Database).
///
/// Each section keeps its own defaults; loading values from the environment
/// or files is left to the caller.
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    /// Where and how to open sessions.
    pub connection: Config,
    /// Pool sizing, validation and recycling.
    pub pool: PoolConfig,
    /// Statement timeouts and autocommit.
    pub executor: ExecutorConfig,
    /// Metadata TTL and capacity.
    pub cache: CacheConfig,
}

impl DatabaseConfig {
    /// Start from a connection configuration with default pool, executor
    /// and cache settings.
    #[must_use]
    pub fn new(connection: Config) -> Self {
        Self {
            connection,
            ..Self::default()
        }
    }

    /// Parse an EZConnect or key-value connection string.
    pub fn from_connection_string(conn_str: &str) -> Result<Self, Error> {
        Config::from_connection_string(conn_str).map(Self::new)
    }

    /// Replace the pool section.
    #[must_use]
    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Replace the executor section.
    #[must_use]
    pub fn executor(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }

    /// Replace the cache section.
    #[must_use]
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), Error> {
        self.connection.validate()?;
        self.pool.validate()?;
        self.executor.validate()?;
        self.cache.validate()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use ora_client::ErrorKind;

    use super::*;

    #[test]
    fn test_sections_keep_their_defaults() {
        let config = DatabaseConfig::from_connection_string("scott/tiger@db.example:1522/ORCLPDB1")
            .unwrap();
        assert_eq!(config.connection.host, "db.example");
        assert_eq!(config.connection.port, 1522);
        assert_eq!(config.pool.max_connections, PoolConfig::default().max_connections);
        assert!(config.executor.autocommit);
        assert_eq!(config.cache.ttl, CacheConfig::default().ttl);
        config.validate().unwrap();
    }

    #[test]
    fn test_invalid_section_is_reported() {
        let config = DatabaseConfig::from_connection_string("scott/tiger@localhost/FREEPDB1")
            .unwrap()
            .pool(PoolConfig::new().min_connections(5).max_connections(2));
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::Config);

        let config = DatabaseConfig::from_connection_string("scott/tiger@localhost/FREEPDB1")
            .unwrap()
            .executor(ExecutorConfig::new().statement_timeout(Duration::ZERO));
        assert!(config.validate().is_err());
    }
}
