//! # ora-metadata
//!
//! Schema metadata read from the Oracle data dictionary and cached in memory.
//!
//! - [`SchemaDescriptor`], [`TableDescriptor`], [`ColumnDescriptor`],
//!   [`ConstraintDescriptor`]: structured, serializable metadata
//! - [`ScopeKey`]: normalized cache keys (`SALES`, `SALES.ORDERS`)
//! - [`MetadataCache`]: TTL + LRU cache with single-flight fetches and the
//!   [`RefreshPolicy`] variants `PreferCache`, `ForceRefresh`, `StaleIfError`
//! - [`TableDescriptor::to_ddl`]: `CREATE TABLE` rendering
//!
//! ## Example
//!
//! ```rust,ignore
//! use ora_metadata::{CacheConfig, MetadataCache, RefreshPolicy};
//!
//! let cache = MetadataCache::new(executor, CacheConfig::default())?;
//! let orders = cache.get_table("sales", "orders", RefreshPolicy::PreferCache).await?;
//! for column in &orders.columns {
//!     println!("{} {} {}", column.ordinal, column.name, column.data_type);
//! }
//! println!("{}", orders.to_ddl());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cache;
pub mod config;
pub mod ddl;
pub mod descriptor;
pub mod introspect;
pub mod scope;

pub use cache::{CacheStats, Cached, MetadataCache, RefreshPolicy};
pub use config::CacheConfig;
pub use descriptor::{
    ColumnDescriptor, ConstraintDescriptor, ConstraintKind, DeleteRule, SchemaDescriptor,
    TableDescriptor,
};
pub use introspect::Introspector;
pub use scope::ScopeKey;
