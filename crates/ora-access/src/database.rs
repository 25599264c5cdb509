//! The [`Database`] handle.

use std::sync::Arc;
use std::time::Duration;

use ora_client::{Driver, Error, Query, Result, RowSet};
use ora_metadata::{
    CacheStats, Cached, MetadataCache, RefreshPolicy, SchemaDescriptor, ScopeKey, TableDescriptor,
};
use ora_pool::{
    ConnectionLifecycle, Pool, PoolMetrics, PoolStatus, PooledConnection, ShutdownReport,
};
use ora_query::{ExecutionHook, Executor};

use crate::config::DatabaseConfig;

/// A managed connection to one Oracle database.
///
/// Owns the connection pool, the query executor that borrows from it and the
/// metadata cache that reads the data dictionary through the executor.
/// Cloning is cheap and every clone shares the same pool and cache.
///
/// A `Database` is created explicitly with [`Database::connect`] (which warms
/// the pool to its minimum size) and torn down with [`Database::shutdown`].
#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool,
    executor: Executor,
    cache: MetadataCache,
}

impl Database {
    /// Create a builder for `driver`.
    #[must_use]
    pub fn builder(driver: Arc<dyn Driver>) -> DatabaseBuilder {
        DatabaseBuilder::new(driver)
    }

    /// Open the pool and assemble the executor and metadata cache.
    ///
    /// Fails if the configuration is invalid or the pool cannot be warmed to
    /// its minimum size.
    pub async fn connect(driver: Arc<dyn Driver>, config: DatabaseConfig) -> Result<Self> {
        Self::builder(driver).config(config).build().await
    }

    /// Acquire a connection for direct use, waiting at most `timeout`.
    ///
    /// Give it back with [`Database::release`].
    pub async fn acquire(&self, timeout: Duration) -> Result<PooledConnection> {
        self.pool.acquire(timeout).await
    }

    /// Return a connection obtained from [`Database::acquire`].
    pub async fn release(&self, conn: PooledConnection) {
        self.pool.release(conn).await;
    }

    /// Execute a statement with the default statement timeout.
    pub async fn execute(&self, query: impl Into<Query>) -> Result<RowSet> {
        self.executor.execute(query).await
    }

    /// Execute a statement; `timeout` covers both acquisition and execution.
    pub async fn execute_with_timeout(
        &self,
        query: impl Into<Query>,
        timeout: Duration,
    ) -> Result<RowSet> {
        self.executor.execute_with_timeout(query, timeout).await
    }

    /// Describe a schema and all of its tables.
    pub async fn get_schema(
        &self,
        name: &str,
        policy: RefreshPolicy,
    ) -> Result<Cached<SchemaDescriptor>> {
        self.cache.get_schema(name, policy).await
    }

    /// Describe one table.
    pub async fn get_table(
        &self,
        schema: &str,
        table: &str,
        policy: RefreshPolicy,
    ) -> Result<Cached<TableDescriptor>> {
        self.cache.get_table(schema, table, policy).await
    }

    /// Drop the cached metadata for `key`.
    ///
    /// Returns whether an entry was removed.
    pub fn invalidate(&self, key: &ScopeKey) -> bool {
        self.cache.invalidate(key)
    }

    /// Drop a schema and every cached table in it.
    pub fn invalidate_schema(&self, name: &str) -> Result<usize> {
        self.cache.invalidate_schema(name)
    }

    /// Current pool occupancy.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        self.pool.status()
    }

    /// Cumulative pool counters.
    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        self.pool.metrics()
    }

    /// Metadata cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// The underlying executor.
    #[must_use]
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// The underlying metadata cache.
    #[must_use]
    pub fn metadata(&self) -> &MetadataCache {
        &self.cache
    }

    /// Whether [`Database::shutdown`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Stop accepting work, wait up to `drain_timeout` for checked-out
    /// connections and close everything.
    ///
    /// Cached metadata is discarded. Calling this more than once is harmless.
    pub async fn shutdown(&self, drain_timeout: Duration) -> ShutdownReport {
        let report = self.pool.shutdown(drain_timeout).await;
        self.cache.clear();
        tracing::info!(
            drained = report.drained,
            forced = report.forced,
            idle_closed = report.idle_closed,
            "database closed"
        );
        report
    }
}

/// Builder for [`Database`].
///
/// ```rust,ignore
/// let db = Database::builder(driver)
///     .config(DatabaseConfig::from_connection_string("scott/tiger@db:1521/ORCLPDB1")?)
///     .hook(Arc::new(StatementValidator::new()))
///     .hook(Arc::new(PerformanceMonitor::default()))
///     .build()
///     .await?;
/// ```
pub struct DatabaseBuilder {
    driver: Arc<dyn Driver>,
    config: DatabaseConfig,
    hooks: Vec<Arc<dyn ExecutionHook>>,
    lifecycle: Option<Arc<dyn ConnectionLifecycle>>,
}

impl DatabaseBuilder {
    /// Create a builder with the default configuration.
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            driver,
            config: DatabaseConfig::default(),
            hooks: Vec::new(),
            lifecycle: None,
        }
    }

    /// Set the configuration.
    #[must_use]
    pub fn config(mut self, config: DatabaseConfig) -> Self {
        self.config = config;
        self
    }

    /// Append an execution hook. Hooks run in the order they are added.
    #[must_use]
    pub fn hook(mut self, hook: Arc<dyn ExecutionHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Use a custom connection lifecycle instead of the default one.
    #[must_use]
    pub fn lifecycle(mut self, lifecycle: Arc<dyn ConnectionLifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Validate the configuration, warm the pool and assemble the handle.
    pub async fn build(self) -> Result<Database> {
        let DatabaseConfig {
            connection,
            pool,
            executor,
            cache,
        } = self.config;
        executor.validate()?;
        cache.validate()?;

        let pool = match self.lifecycle {
            Some(lifecycle) => Pool::with_lifecycle(self.driver, connection, pool, lifecycle).await?,
            None => Pool::new(self.driver, connection, pool).await?,
        };

        let executor = match Executor::with_config(pool.clone(), executor) {
            Ok(executor) => executor,
            Err(e) => return Err(close_on_error(&pool, e).await),
        };
        let executor = self
            .hooks
            .into_iter()
            .fold(executor, |executor, hook| executor.with_hook(hook));

        let cache = match MetadataCache::new(executor.clone(), cache) {
            Ok(cache) => cache,
            Err(e) => return Err(close_on_error(&pool, e).await),
        };

        tracing::debug!(hooks = ?executor.hooks(), "database ready");

        Ok(Database {
            pool,
            executor,
            cache,
        })
    }
}

impl std::fmt::Debug for DatabaseBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseBuilder")
            .field("config", &self.config)
            .field("hooks", &self.hooks.len())
            .field("custom_lifecycle", &self.lifecycle.is_some())
            .finish_non_exhaustive()
    }
}

async fn close_on_error(pool: &Pool, error: Error) -> Error {
    pool.shutdown(Duration::ZERO).await;
    error
}
