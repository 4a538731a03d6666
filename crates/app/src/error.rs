//! Errors surfaced by the command layer.

use tessera_application::{AuthError, OnboardingError};
use tessera_application::ports::RemoteError;
use tessera_infrastructure::ConfigError;
use thiserror::Error;

/// Any failure of a command.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP transport could not be built.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A session operation failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Onboarding failed.
    #[error(transparent)]
    Onboarding(#[from] OnboardingError),

    /// A file or terminal could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A batch file is not valid JSON.
    #[error("invalid batch file: {0}")]
    Batch(#[from] serde_json::Error),

    /// The command needs a signed-in session.
    #[error("not signed in; run `tessera login <email>` first")]
    NotSignedIn,
}
