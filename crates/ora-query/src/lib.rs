//! # ora-query
//!
//! Statement execution on top of [`ora_pool`].
//!
//! [`Executor`] borrows a connection, runs one statement under a time budget,
//! returns the connection on every exit path and reports the outcome as
//! [`ora_client::Result`]. Statement errors leave the session in the pool;
//! connection errors and uncancellable timeouts discard it.
//!
//! Callbacks can be wrapped around every statement with [`ExecutionHook`];
//! the built-in [`PerformanceMonitor`], [`SecurityAudit`] and
//! [`StatementValidator`] cover timings, auditing and pre-flight checks.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ora_client::Query;
//! use ora_query::{Executor, PerformanceMonitor};
//!
//! let executor = Executor::new(pool).with_hook(Arc::new(PerformanceMonitor::default()));
//!
//! let rows = executor
//!     .execute(Query::new("SELECT ename FROM emp WHERE deptno = :1").bind(&10i64))
//!     .await?;
//! for row in &rows {
//!     let name: String = row.get_by_name("ENAME")?;
//!     println!("{name}");
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod executor;
pub mod hooks;

pub use config::ExecutorConfig;
pub use executor::Executor;
pub use hooks::{
    AuditOutcome, AuditRecord, ExecutionContext, ExecutionHook, ExecutionOutcome, HookChain,
    HookRejection, OperationStats, PerformanceMonitor, SecurityAudit, StatementValidator,
    count_bind_placeholders,
};
