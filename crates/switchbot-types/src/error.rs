//! Error types for response decoding in switchbot-types.

use thiserror::Error;

/// Errors that can occur when decoding a SwitchBot response payload.
///
/// This error type is platform-agnostic and does not include
/// BLE-specific errors (those belong in switchbot-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The payload is too short to index every field the decoder needs.
    #[error("Insufficient bytes: expected at least {expected}, got {actual}")]
    InsufficientBytes {
        /// Minimum number of bytes required.
        expected: usize,
        /// Number of bytes actually received.
        actual: usize,
    },
}

/// Result type alias using switchbot-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_bytes_display() {
        let err = ParseError::InsufficientBytes {
            expected: 11,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient bytes: expected at least 11, got 3"
        );
    }
}
