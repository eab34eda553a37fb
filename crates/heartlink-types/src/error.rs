//! Error types for data parsing in heartlink-types.

use thiserror::Error;

/// Errors that can occur when decoding heart rate characteristic values.
///
/// This error type is platform-agnostic and does not include
/// BLE-specific errors (those belong in heartlink-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The payload was shorter than the format requires.
    #[error("Insufficient bytes: requires {expected} bytes, got {actual}")]
    InsufficientBytes {
        /// Minimum number of bytes needed.
        expected: usize,
        /// Number of bytes received.
        actual: usize,
    },

    /// A field held a value outside its allowed range.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// A name could not be resolved to a GATT UUID.
    #[error("Unknown GATT name: {0}")]
    UnknownName(String),
}

impl ParseError {
    /// Create an insufficient-bytes error.
    pub fn insufficient(expected: usize, actual: usize) -> Self {
        Self::InsufficientBytes { expected, actual }
    }
}

/// Result type alias using heartlink-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
