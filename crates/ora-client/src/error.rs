//! Error taxonomy shared by the pool, executor and metadata cache.
//!
//! Every public operation in the workspace returns [`Result<T>`], whose error
//! side is the single [`Error`] enum defined here. Errors reported by the
//! driver collaborator arrive as [`DriverError`] and are classified into the
//! connection-level / statement-level split the pool relies on.

use std::fmt;
use std::time::Duration;

use ora_types::TypeError;
use thiserror::Error;

/// Result type used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a driver failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DriverErrorKind {
    /// The session is gone or unusable (network failure, instance shutdown,
    /// killed session). The physical connection must be discarded.
    Connection,
    /// The statement failed; the session is still usable.
    Statement,
    /// The statement failed for a reason that may go away on retry
    /// (deadlock, resource busy, serialization failure). The session is still
    /// usable.
    Transient,
    /// The driver's own call timeout expired; session state is unknown.
    Timeout,
    /// The call was cancelled (`ORA-01013`).
    Cancelled,
}

/// An error reported by the driver collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    kind: DriverErrorKind,
    code: Option<u32>,
    message: String,
}

impl DriverError {
    /// Create an error of the given kind without an Oracle error code.
    pub fn new(kind: DriverErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
        }
    }

    /// Create a connection-level error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Connection, message)
    }

    /// Create a statement-level error.
    pub fn statement(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Statement, message)
    }

    /// Create an error from an `ORA-nnnnn` code, classifying it.
    pub fn from_ora_code(code: u32, message: impl Into<String>) -> Self {
        Self {
            kind: classify_ora_code(code),
            code: Some(code),
            message: message.into(),
        }
    }

    /// Create an error from a driver message of the form
    /// `ORA-00001: unique constraint (...) violated`.
    ///
    /// Messages without a recognizable code are treated as statement errors.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        match parse_ora_code(&message) {
            Some((code, rest)) => {
                let rest = rest.to_string();
                Self::from_ora_code(code, rest)
            }
            None => Self::statement(message),
        }
    }

    /// The failure classification.
    #[must_use]
    pub fn kind(&self) -> DriverErrorKind {
        self.kind
    }

    /// The Oracle error number, if known.
    #[must_use]
    pub fn code(&self) -> Option<u32> {
        self.code
    }

    /// The error message without the `ORA-nnnnn:` prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the physical connection must be discarded.
    #[must_use]
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self.kind,
            DriverErrorKind::Connection | DriverErrorKind::Timeout
        )
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "ORA-{code:05}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for DriverError {}

/// Map an Oracle error number to a failure class.
#[must_use]
pub fn classify_ora_code(code: u32) -> DriverErrorKind {
    match code {
        // end-of-file on communication channel, not connected, connection
        // lost contact, not logged on, session killed, listener/TNS failures,
        // idle time exceeded, instance unavailable or shutting down
        3113 | 3114 | 3135 | 1012 | 28 | 12541 | 12170 | 12514 | 12537 | 12547 | 2396
        | 1033 | 1034 | 1089 => DriverErrorKind::Connection,
        // resource busy, deadlock, serialization failure, no dispatcher or
        // handler available
        54 | 60 | 8177 | 12516 | 12519 | 12520 => DriverErrorKind::Transient,
        1013 => DriverErrorKind::Cancelled,
        _ => DriverErrorKind::Statement,
    }
}

fn parse_ora_code(message: &str) -> Option<(u32, &str)> {
    let rest = message.trim_start().strip_prefix("ORA-")?;
    let (digits, tail) = rest.split_once(':').unwrap_or((rest, ""));
    let code = digits.trim().parse().ok()?;
    Some((code, tail.trim()))
}

/// Errors surfaced by pool, executor, metadata cache and facade operations.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum Error {
    /// No connection became available before the acquire timeout.
    #[error("connection pool exhausted: no connection available within {timeout:?}")]
    PoolExhausted {
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The pool has been shut down.
    #[error("connection pool is closed")]
    PoolClosed,

    /// The acquisition part of an execution budget elapsed.
    #[error("timed out acquiring a connection after {timeout:?}")]
    AcquireTimeout {
        /// The acquisition budget that elapsed.
        timeout: Duration,
    },

    /// Opening a new physical connection failed.
    #[error("failed to open connection: {0}")]
    ConnectFailed(DriverError),

    /// The connection died during an operation; it has been discarded.
    #[error("connection lost: {0}")]
    ConnectionLost(DriverError),

    /// The statement failed; the connection remains usable.
    #[error("statement error: {0}")]
    Statement(DriverError),

    /// The statement did not complete within its timeout.
    #[error("statement timed out after {timeout:?} (cancelled: {cancelled})")]
    ExecutionTimeout {
        /// The execution budget that elapsed.
        timeout: Duration,
        /// Whether the in-flight call was cancelled cleanly. When `false` the
        /// connection has been discarded.
        cancelled: bool,
    },

    /// Fetching catalog metadata failed.
    #[error("metadata fetch failed for {scope}: {source}")]
    MetadataFetchFailed {
        /// The scope key being fetched.
        scope: String,
        /// The underlying failure.
        source: Box<Error>,
    },

    /// The requested schema or table does not exist.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// An identifier failed validation.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The driver returned a result that violates its contract (for example,
    /// a row wider than the column list). The connection has been discarded.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A value could not be converted.
    #[error("type error: {0}")]
    Type(#[from] TypeError),

    /// An execution hook rejected the statement before it reached the pool.
    #[error("statement rejected by {hook}: {reason}")]
    Rejected {
        /// Name of the rejecting hook.
        hook: String,
        /// Reason given by the hook.
        reason: String,
    },
}

/// Discriminant of [`Error`] for exhaustive matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// See [`Error::PoolExhausted`].
    PoolExhausted,
    /// See [`Error::PoolClosed`].
    PoolClosed,
    /// See [`Error::AcquireTimeout`].
    AcquireTimeout,
    /// See [`Error::ConnectFailed`].
    ConnectFailed,
    /// See [`Error::ConnectionLost`].
    ConnectionLost,
    /// See [`Error::Statement`].
    Statement,
    /// See [`Error::ExecutionTimeout`].
    ExecutionTimeout,
    /// See [`Error::MetadataFetchFailed`].
    MetadataFetchFailed,
    /// See [`Error::ObjectNotFound`].
    ObjectNotFound,
    /// See [`Error::InvalidIdentifier`].
    InvalidIdentifier,
    /// See [`Error::Config`].
    Config,
    /// See [`Error::Protocol`].
    Protocol,
    /// See [`Error::Type`].
    Type,
    /// See [`Error::Rejected`].
    Rejected,
}

impl Error {
    /// Classify a driver failure that happened while using a connection.
    #[must_use]
    pub fn from_driver(err: DriverError) -> Self {
        if err.is_connection_fatal() {
            Self::ConnectionLost(err)
        } else {
            Self::Statement(err)
        }
    }

    /// The error discriminant.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PoolExhausted { .. } => ErrorKind::PoolExhausted,
            Self::PoolClosed => ErrorKind::PoolClosed,
            Self::AcquireTimeout { .. } => ErrorKind::AcquireTimeout,
            Self::ConnectFailed(_) => ErrorKind::ConnectFailed,
            Self::ConnectionLost(_) => ErrorKind::ConnectionLost,
            Self::Statement(_) => ErrorKind::Statement,
            Self::ExecutionTimeout { .. } => ErrorKind::ExecutionTimeout,
            Self::MetadataFetchFailed { .. } => ErrorKind::MetadataFetchFailed,
            Self::ObjectNotFound(_) => ErrorKind::ObjectNotFound,
            Self::InvalidIdentifier(_) => ErrorKind::InvalidIdentifier,
            Self::Config(_) => ErrorKind::Config,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Type(_) => ErrorKind::Type,
            Self::Rejected { .. } => ErrorKind::Rejected,
        }
    }

    /// Whether the connection involved has been (or must be) discarded.
    #[must_use]
    pub fn is_connection_fatal(&self) -> bool {
        match self {
            Self::ConnectionLost(_) | Self::Protocol(_) => true,
            Self::ExecutionTimeout { cancelled, .. } => !cancelled,
            _ => false,
        }
    }

    /// Whether this is one of the timeout kinds.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::PoolExhausted { .. } | Self::AcquireTimeout { .. } | Self::ExecutionTimeout { .. }
        )
    }

    /// Whether retrying the operation later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::PoolExhausted { .. } | Self::AcquireTimeout { .. } => true,
            Self::Statement(e) => e.kind() == DriverErrorKind::Transient,
            Self::MetadataFetchFailed { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// The driver error carried by this error, if any.
    #[must_use]
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Self::ConnectFailed(e) | Self::ConnectionLost(e) | Self::Statement(e) => Some(e),
            Self::MetadataFetchFailed { source, .. } => source.driver_error(),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_ora_codes() {
        assert_eq!(classify_ora_code(3113), DriverErrorKind::Connection);
        assert_eq!(classify_ora_code(28), DriverErrorKind::Connection);
        assert_eq!(classify_ora_code(60), DriverErrorKind::Transient);
        assert_eq!(classify_ora_code(1013), DriverErrorKind::Cancelled);
        assert_eq!(classify_ora_code(1), DriverErrorKind::Statement);
        assert_eq!(classify_ora_code(942), DriverErrorKind::Statement);
    }

    #[test]
    fn test_driver_error_from_message() {
        let err = DriverError::from_message("ORA-00001: unique constraint (SALES.PK) violated");
        assert_eq!(err.code(), Some(1));
        assert_eq!(err.kind(), DriverErrorKind::Statement);
        assert_eq!(err.message(), "unique constraint (SALES.PK) violated");
        assert_eq!(
            err.to_string(),
            "ORA-00001: unique constraint (SALES.PK) violated"
        );

        let plain = DriverError::from_message("socket closed");
        assert_eq!(plain.code(), None);
        assert_eq!(plain.to_string(), "socket closed");
    }

    #[test]
    fn test_from_driver_splits_fatal() {
        let lost = Error::from_driver(DriverError::from_ora_code(3113, "end-of-file"));
        assert_eq!(lost.kind(), ErrorKind::ConnectionLost);
        assert!(lost.is_connection_fatal());

        let stmt = Error::from_driver(DriverError::from_ora_code(942, "table does not exist"));
        assert_eq!(stmt.kind(), ErrorKind::Statement);
        assert!(!stmt.is_connection_fatal());

        let timeout = Error::from_driver(DriverError::new(DriverErrorKind::Timeout, "call timeout"));
        assert_eq!(timeout.kind(), ErrorKind::ConnectionLost);
    }

    #[test]
    fn test_timeout_kinds() {
        let cancelled = Error::ExecutionTimeout {
            timeout: Duration::from_millis(10),
            cancelled: true,
        };
        assert!(cancelled.is_timeout());
        assert!(!cancelled.is_connection_fatal());

        let stuck = Error::ExecutionTimeout {
            timeout: Duration::from_millis(10),
            cancelled: false,
        };
        assert!(stuck.is_connection_fatal());
        assert!(Error::PoolExhausted {
            timeout: Duration::ZERO
        }
        .is_timeout());
        assert!(!Error::PoolClosed.is_timeout());
    }

    #[test]
    fn test_metadata_error_exposes_source() {
        let err = Error::MetadataFetchFailed {
            scope: "SALES".into(),
            source: Box::new(Error::Statement(DriverError::from_ora_code(60, "deadlock"))),
        };
        assert!(err.is_transient());
        assert_eq!(err.driver_error().unwrap().code(), Some(60));
        assert!(err.to_string().contains("SALES"));
    }
}
