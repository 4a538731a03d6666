//! Application error types

use thiserror::Error;
use tessera_domain::DomainError;

use crate::auth::AuthError;
use crate::pipeline::PipelineError;
use crate::ports::StorageError;
use crate::use_cases::OnboardingError;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// A domain validation error occurred.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// A session operation failed.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// An outgoing request failed.
    #[error("request error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Onboarding failed.
    #[error("onboarding error: {0}")]
    Onboarding(#[from] OnboardingError),

    /// A storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type alias for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
