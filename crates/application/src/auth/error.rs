//! Typed outcomes of failed session operations

use thiserror::Error;

use crate::ports::RemoteError;

/// Why a session operation did not succeed.
///
/// Remote failures are converted into this type at the operation boundary;
/// raw transport errors never escape the session store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Wrong password, wrong code or similar. Nothing changed.
    #[error("{0}")]
    CredentialRejected(String),

    /// The server issued a token that failed local shape validation.
    #[error("the server returned invalid tokens: {0}")]
    TokenFormatInvalid(String),

    /// The server reported the refresh token as expired or invalid.
    #[error("session expired: {0}")]
    RefreshExpiredOrInvalid(String),

    /// The server reported that the password expired.
    #[error("password expired")]
    PasswordExpired,

    /// The server could not be reached; try again later.
    #[error("network error: {0}")]
    NetworkTransient(String),

    /// A step of the multi-step login ran without its earlier steps.
    #[error("no login in progress")]
    MissingPendingContext,
}

impl From<RemoteError> for AuthError {
    fn from(error: RemoteError) -> Self {
        Self::NetworkTransient(error.to_string())
    }
}
