//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A token does not have the shape of a JWT or an opaque token.
    #[error("invalid token format: {0}")]
    InvalidTokenFormat(String),

    /// An authentication context tag is not recognized.
    #[error("unknown auth context: {0}")]
    UnknownAuthContext(String),

    /// The HTTP method is not supported.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// An identifier is invalid or empty.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
