//! Type conversion errors.

use thiserror::Error;

/// Errors that can occur while converting between Oracle and Rust values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TypeError {
    /// A NULL value was found where a non-null value was required.
    #[error("unexpected NULL value")]
    UnexpectedNull,

    /// The value has a different type than requested.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type.
        expected: &'static str,
        /// Description of the actual value.
        actual: String,
    },

    /// The value does not fit the target type.
    #[error("value {value} out of range for {target}")]
    OutOfRange {
        /// Target Rust type.
        target: &'static str,
        /// Offending value.
        value: String,
    },

    /// A type declaration could not be parsed.
    #[error("invalid type declaration: {0}")]
    InvalidTypeName(String),
}
