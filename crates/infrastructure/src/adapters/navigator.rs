//! Navigator forwarding login redirects over a channel.

use tessera_application::ports::Navigator;
use tessera_domain::LogoutReason;
use tokio::sync::mpsc;

/// Sends every redirect request to the receiver returned by [`ChannelNavigator::new`].
///
/// The front end (the CLI loop here) owns the receiver and decides how to
/// present the login entry point.
#[derive(Debug, Clone)]
pub struct ChannelNavigator {
    redirects: mpsc::UnboundedSender<LogoutReason>,
}

impl ChannelNavigator {
    /// Create the navigator and the receiving end.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LogoutReason>) {
        let (redirects, receiver) = mpsc::unbounded_channel();
        (Self { redirects }, receiver)
    }
}

impl Navigator for ChannelNavigator {
    fn redirect_to_login(&self, reason: LogoutReason) {
        tracing::info!(?reason, notice = reason.notice(), "redirecting to login");
        if self.redirects.send(reason).is_err() {
            tracing::debug!("no one is listening for login redirects");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_redirect_is_delivered() {
        let (navigator, mut receiver) = ChannelNavigator::new();
        navigator.redirect_to_login(LogoutReason::PasswordExpired);
        assert_eq!(receiver.recv().await, Some(LogoutReason::PasswordExpired));
    }

    #[test]
    fn test_redirect_without_receiver_does_not_fail() {
        let (navigator, receiver) = ChannelNavigator::new();
        drop(receiver);
        navigator.redirect_to_login(LogoutReason::SessionExpired);
    }
}
