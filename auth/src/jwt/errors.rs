use thiserror::Error;

use super::claims::TokenKind;

/// Error type for session token operations.
///
/// The variants distinguish why a token was rejected so callers can log
/// the real reason; user-facing layers are expected to collapse all of
/// them into a single generic "invalid token" code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),

    #[error("Token is expired")]
    Expired,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token is malformed: {0}")]
    Malformed(String),

    #[error("Token type mismatch: expected {expected}, got {actual}")]
    WrongType {
        expected: TokenKind,
        actual: TokenKind,
    },
}
