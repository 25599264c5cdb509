//! # ora-testing
//!
//! Test infrastructure for the Oracle access layer.
//!
//! - [`MockDriver`]: an in-memory driver with scripted responses, failure
//!   injection (connect errors, failed probes, killed sessions, failed
//!   cancels) and counters for assertions
//! - [`MockCatalog`]: a mutable fake data dictionary served through the
//!   driver
//! - [`test_config`] and [`init_tracing`]: common setup

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod catalog;
pub mod mock;

pub use catalog::{MockCatalog, MockColumn, MockConstraint, MockTable};
pub use mock::{MockConnection, MockDriver, MockResponse, VALIDATION_SQL};

use ora_client::Config;

/// A connection configuration that passes validation.
pub fn test_config() -> Config {
    Config::new()
        .host("localhost")
        .service_name("FREEPDB1")
        .credentials(ora_client::Credentials::password("scott", "tiger"))
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// The filter comes from `RUST_LOG` and defaults to `debug` for the
/// workspace crates. Calling it more than once is harmless.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(
            "ora_pool=debug,ora_query=debug,ora_metadata=debug,ora_access=debug",
        )
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
