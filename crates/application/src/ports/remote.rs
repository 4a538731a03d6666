//! Transport-level failures shared by every remote port

use thiserror::Error;

/// A remote call failed before producing a usable response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The server could not be reached.
    #[error("connection failed: {0}")]
    Connectivity(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// The server answered with an unexpected status and no readable body.
    #[error("server returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw body or reason.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

impl RemoteError {
    /// Returns true for failures that say nothing about credential validity:
    /// unreachable server, timeout, or a 5xx answer.
    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        match self {
            Self::Connectivity(_) | Self::Timeout => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Decode(_) | Self::Other(_) => false,
        }
    }
}

/// Result of a remote call.
pub type RemoteResult<T> = Result<T, RemoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_classification() {
        assert!(RemoteError::Timeout.is_connectivity());
        assert!(RemoteError::Connectivity("refused".into()).is_connectivity());
        assert!(
            RemoteError::Status {
                status: 503,
                message: "unavailable".into()
            }
            .is_connectivity()
        );
        assert!(
            !RemoteError::Status {
                status: 400,
                message: "bad".into()
            }
            .is_connectivity()
        );
        assert!(!RemoteError::Decode("garbage".into()).is_connectivity());
    }
}
