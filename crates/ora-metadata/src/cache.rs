//! In-memory metadata cache with TTL expiry and single-flight fetches.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::ops::Deref;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use ora_client::{Error, ErrorKind, Result};
use ora_query::Executor;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::config::CacheConfig;
use crate::descriptor::{SchemaDescriptor, TableDescriptor};
use crate::introspect::Introspector;
use crate::scope::ScopeKey;

/// How a lookup treats a cached entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RefreshPolicy {
    /// Serve a fresh entry; fetch when there is none or it has expired.
    #[default]
    PreferCache,
    /// Always fetch. Joins a fetch of the same key that is already running.
    ForceRefresh,
    /// Like `PreferCache`, but when the fetch fails and an entry exists
    /// (expired or not), serve it flagged stale instead of failing.
    StaleIfError,
}

/// A descriptor served by [`MetadataCache`].
#[derive(Debug)]
pub struct Cached<T> {
    value: Arc<T>,
    stale: bool,
    fetched_at: Instant,
}

impl<T> Cached<T> {
    /// Whether this is an expired entry served because a refresh failed.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// When the descriptor was read from the catalog.
    #[must_use]
    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    /// Time since the descriptor was read.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    /// The shared descriptor.
    #[must_use]
    pub fn as_arc(&self) -> &Arc<T> {
        &self.value
    }

    /// Unwrap into the shared descriptor.
    #[must_use]
    pub fn into_inner(self) -> Arc<T> {
        self.value
    }
}

impl<T> Clone for Cached<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            stale: self.stale,
            fetched_at: self.fetched_at,
        }
    }
}

impl<T> Deref for Cached<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// Cumulative cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from a fresh entry.
    pub hits: u64,
    /// Lookups that had to wait for a fetch (started or joined).
    pub misses: u64,
    /// Catalog fetches started.
    pub fetches: u64,
    /// Fetches that failed.
    pub fetch_failures: u64,
    /// Lookups answered with a stale entry after a failed fetch.
    pub stale_served: u64,
    /// Entries currently cached.
    pub entries: usize,
}

struct Stored<T> {
    value: Arc<T>,
    fetched_at: Instant,
}

impl<T> Clone for Stored<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            fetched_at: self.fetched_at,
        }
    }
}

type Flight<T> = Shared<BoxFuture<'static, Result<Stored<T>>>>;

struct Tier<T> {
    entries: LruCache<ScopeKey, Stored<T>>,
    inflight: HashMap<ScopeKey, (u64, Flight<T>)>,
}

impl<T> Tier<T> {
    fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            inflight: HashMap::new(),
        }
    }

    fn forget(&mut self, key: &ScopeKey) -> bool {
        self.inflight.remove(key);
        self.entries.pop(key).is_some()
    }

    fn forget_where(&mut self, mut matches: impl FnMut(&ScopeKey) -> bool) -> usize {
        self.inflight.retain(|key, _| !matches(key));
        let keys: Vec<ScopeKey> = self
            .entries
            .iter()
            .map(|(key, _)| key)
            .filter(|&key| matches(key))
            .cloned()
            .collect();
        for key in &keys {
            self.entries.pop(key);
        }
        keys.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.inflight.clear();
    }
}

struct State {
    schemas: Tier<SchemaDescriptor>,
    tables: Tier<TableDescriptor>,
    next_flight: u64,
    stats: CacheStats,
}

impl State {
    fn invalidate(&mut self, key: &ScopeKey) -> bool {
        match key {
            ScopeKey::Schema(_) => self.schemas.forget(key),
            // The schema descriptor embeds the table, so it goes too.
            ScopeKey::Table { schema, .. } => {
                let table = self.tables.forget(key);
                let schema = self.schemas.forget(&ScopeKey::Schema(schema.clone()));
                table || schema
            }
        }
    }

    fn invalidate_schema(&mut self, schema: &str) -> usize {
        let schemas = self.schemas.forget_where(|key| key.schema_name() == schema);
        let tables = self.tables.forget_where(|key| key.schema_name() == schema);
        schemas + tables
    }
}

/// A descriptor type the cache knows how to fetch and store.
trait Descriptor: Send + Sync + Sized + 'static {
    const KIND: &'static str;

    fn tier(state: &mut State) -> &mut Tier<Self>;

    fn fetch(introspector: Introspector, key: ScopeKey) -> BoxFuture<'static, Result<Self>>;

    fn on_stored(_state: &mut State, _stored: &Stored<Self>) {}
}

impl Descriptor for SchemaDescriptor {
    const KIND: &'static str = "schema";

    fn tier(state: &mut State) -> &mut Tier<Self> {
        &mut state.schemas
    }

    fn fetch(introspector: Introspector, key: ScopeKey) -> BoxFuture<'static, Result<Self>> {
        async move { introspector.fetch_schema(key.schema_name()).await }.boxed()
    }

    fn on_stored(state: &mut State, stored: &Stored<Self>) {
        for table in &stored.value.tables {
            let key = ScopeKey::Table {
                schema: table.schema.clone(),
                table: table.name.clone(),
            };
            state.tables.entries.put(
                key,
                Stored {
                    value: Arc::new(table.clone()),
                    fetched_at: stored.fetched_at,
                },
            );
        }
    }
}

impl Descriptor for TableDescriptor {
    const KIND: &'static str = "table";

    fn tier(state: &mut State) -> &mut Tier<Self> {
        &mut state.tables
    }

    fn fetch(introspector: Introspector, key: ScopeKey) -> BoxFuture<'static, Result<Self>> {
        async move {
            let table = key.table_name().unwrap_or_default();
            introspector.fetch_table(key.schema_name(), table).await
        }
        .boxed()
    }
}

struct Inner {
    introspector: Introspector,
    config: CacheConfig,
    state: Mutex<State>,
}

impl Inner {
    fn complete<T: Descriptor>(&self, key: &ScopeKey, id: u64, result: &Result<Stored<T>>) {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if result.is_err() {
            state.stats.fetch_failures += 1;
        }

        let current = T::tier(state)
            .inflight
            .get(key)
            .is_some_and(|(running, _)| *running == id);
        if !current {
            tracing::debug!(scope = %key, "fetch was invalidated while running, result not cached");
            return;
        }
        T::tier(state).inflight.remove(key);

        match result {
            Ok(stored) => {
                T::tier(state).entries.put(key.clone(), stored.clone());
                T::on_stored(state, stored);
            }
            Err(e) if e.kind() == ErrorKind::ObjectNotFound => {
                state.invalidate(key);
            }
            Err(_) => {}
        }
    }
}

/// Caches schema and table descriptors read from the data dictionary.
///
/// Entries expire after the configured TTL and the least recently used ones
/// are evicted once `max_entries` is reached. Concurrent lookups of one key
/// share a single catalog fetch; lookups of other keys are not blocked by
/// it. Fetches run on a spawned task and complete (and populate the cache)
/// even if every caller waiting on them gives up.
///
/// Cloning yields another handle to the same cache.
#[derive(Clone)]
pub struct MetadataCache {
    inner: Arc<Inner>,
}

impl MetadataCache {
    /// Create a cache that reads the catalog through `executor`.
    pub fn new(executor: Executor, config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let capacity = NonZeroUsize::new(config.max_entries)
            .ok_or_else(|| Error::Config("max_entries must be at least 1".into()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                introspector: Introspector::new(executor, config.fetch_timeout),
                state: Mutex::new(State {
                    schemas: Tier::new(capacity),
                    tables: Tier::new(capacity),
                    next_flight: 1,
                    stats: CacheStats::default(),
                }),
                config,
            }),
        })
    }

    /// Look up a schema and all of its tables.
    ///
    /// A successful fetch also caches each table, so a following
    /// [`get_table`](Self::get_table) in the same schema is a hit.
    pub async fn get_schema(
        &self,
        name: &str,
        policy: RefreshPolicy,
    ) -> Result<Cached<SchemaDescriptor>> {
        self.load(ScopeKey::schema(name)?, policy).await
    }

    /// Look up one table.
    pub async fn get_table(
        &self,
        schema: &str,
        table: &str,
        policy: RefreshPolicy,
    ) -> Result<Cached<TableDescriptor>> {
        self.load(ScopeKey::table(schema, table)?, policy).await
    }

    /// Drop one entry.
    ///
    /// Invalidating a table also drops the cached descriptor of its schema.
    /// A fetch of the key that is already running still answers its callers
    /// but its result is not cached. Returns whether anything was cached.
    pub fn invalidate(&self, key: &ScopeKey) -> bool {
        let removed = self.inner.state.lock().invalidate(key);
        tracing::debug!(scope = %key, removed, "metadata invalidated");
        removed
    }

    /// Drop a schema and every table cached under it. Returns the number of
    /// entries removed.
    pub fn invalidate_schema(&self, name: &str) -> Result<usize> {
        let key = ScopeKey::schema(name)?;
        let removed = self
            .inner
            .state
            .lock()
            .invalidate_schema(key.schema_name());
        tracing::debug!(scope = %key, removed, "schema metadata invalidated");
        Ok(removed)
    }

    /// Drop everything.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        state.schemas.clear();
        state.tables.clear();
    }

    /// Number of cached entries (schemas plus tables).
    #[must_use]
    pub fn len(&self) -> usize {
        let state = self.inner.state.lock();
        state.schemas.entries.len() + state.tables.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cumulative counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let state = self.inner.state.lock();
        CacheStats {
            entries: state.schemas.entries.len() + state.tables.entries.len(),
            ..state.stats
        }
    }

    /// The cache configuration.
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    async fn load<T: Descriptor>(&self, key: ScopeKey, policy: RefreshPolicy) -> Result<Cached<T>> {
        let (flight, previous) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let previous = T::tier(state).entries.get(&key).cloned();

            let fresh = previous
                .as_ref()
                .filter(|stored| stored.fetched_at.elapsed() < self.inner.config.ttl);
            if let (Some(stored), false) = (fresh, policy == RefreshPolicy::ForceRefresh) {
                state.stats.hits += 1;
                tracing::trace!(scope = %key, kind = T::KIND, "metadata cache hit");
                return Ok(Cached {
                    value: Arc::clone(&stored.value),
                    stale: false,
                    fetched_at: stored.fetched_at,
                });
            }

            state.stats.misses += 1;
            let running = T::tier(state)
                .inflight
                .get(&key)
                .map(|(_, flight)| flight.clone());
            let flight = match running {
                Some(flight) => {
                    tracing::trace!(scope = %key, "joining running metadata fetch");
                    flight
                }
                None => {
                    let id = state.next_flight;
                    state.next_flight += 1;
                    state.stats.fetches += 1;
                    tracing::debug!(scope = %key, kind = T::KIND, ?policy, "fetching metadata");
                    let flight = self.start::<T>(key.clone(), id);
                    T::tier(state).inflight.insert(key.clone(), (id, flight.clone()));
                    flight
                }
            };
            (flight, previous)
        };

        match flight.await {
            Ok(stored) => Ok(Cached {
                value: stored.value,
                stale: false,
                fetched_at: stored.fetched_at,
            }),
            Err(e) if e.kind() == ErrorKind::ObjectNotFound => Err(e),
            Err(e) => match previous {
                Some(stored) if policy == RefreshPolicy::StaleIfError => {
                    self.inner.state.lock().stats.stale_served += 1;
                    tracing::warn!(scope = %key, error = %e, "metadata refresh failed, serving stale entry");
                    Ok(Cached {
                        value: stored.value,
                        stale: true,
                        fetched_at: stored.fetched_at,
                    })
                }
                _ => {
                    tracing::warn!(scope = %key, error = %e, "metadata fetch failed");
                    Err(Error::MetadataFetchFailed {
                        scope: key.to_string(),
                        source: Box::new(e),
                    })
                }
            },
        }
    }

    fn start<T: Descriptor>(&self, key: ScopeKey, id: u64) -> Flight<T> {
        let fetch = T::fetch(self.inner.introspector.clone(), key.clone());
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);

        let task = tokio::spawn(async move {
            let result = fetch.await.map(|value| Stored {
                value: Arc::new(value),
                fetched_at: Instant::now(),
            });
            if let Some(inner) = inner.upgrade() {
                inner.complete(&key, id, &result);
            }
            result
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(Error::Protocol(format!("metadata fetch task failed: {e}"))),
            }
        }
        .boxed()
        .shared()
    }
}

impl std::fmt::Debug for MetadataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataCache")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}
