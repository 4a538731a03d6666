//! Navigation port used when a session ends involuntarily

use tessera_domain::LogoutReason;

/// Port for sending the user back to the login entry point.
pub trait Navigator: Send + Sync {
    /// Redirect to login, showing the reason's notice where it has one.
    fn redirect_to_login(&self, reason: LogoutReason);
}
