//! Proactive access-token renewal.
//!
//! While the session is authenticated a timer periodically calls
//! [`SessionStore::renew_token`]. The timer starts on entering the
//! authenticated phase and stops on leaving it; other state changes
//! (loading flags, errors) do not reset it.

use std::time::Duration;

use tessera_domain::Session;
use tokio::sync::watch;
use tracing::{debug, info};

use super::session_store::SessionStore;
use crate::config::{RENEWAL_FRACTION, RenewalStrategy};
use crate::task::TaskHandle;

/// Shortest period the timer will ever wait.
const MIN_PERIOD: Duration = Duration::from_secs(5);

/// Background timer renewing the access token ahead of expiry.
#[derive(Debug, Clone)]
pub struct RenewalScheduler {
    session: SessionStore,
}

impl RenewalScheduler {
    /// Create a scheduler for `session`.
    #[must_use]
    pub const fn new(session: SessionStore) -> Self {
        Self { session }
    }

    /// Start the timer task. Dropping the handle stops it.
    #[must_use]
    pub fn spawn(self) -> TaskHandle {
        TaskHandle::spawn("renewal", self.run())
    }

    /// Period until the next renewal.
    #[must_use]
    pub fn period(&self) -> Duration {
        let config = self.session.config();
        let period = match config.renewal_strategy {
            RenewalStrategy::Fixed => config.renewal_interval,
            RenewalStrategy::TokenLifetime => self
                .session
                .access_token_remaining()
                .and_then(|remaining| remaining.to_std().ok())
                .map_or(config.renewal_interval, |remaining| {
                    remaining.mul_f64(RENEWAL_FRACTION)
                }),
        };
        period.max(MIN_PERIOD)
    }

    async fn run(self) {
        let mut changes = self.session.subscribe();
        loop {
            if changes.wait_for(Session::is_authenticated).await.is_err() {
                return;
            }
            info!(period = ?self.period(), "renewal timer started");
            self.renew_while_authenticated(&mut changes).await;
            info!("renewal timer stopped");
        }
    }

    async fn renew_while_authenticated(&self, changes: &mut watch::Receiver<Session>) {
        loop {
            let timer = tokio::time::sleep(self.period());
            tokio::pin!(timer);

            loop {
                tokio::select! {
                    () = &mut timer => break,
                    changed = changes.changed() => {
                        if changed.is_err() || !changes.borrow_and_update().is_authenticated() {
                            return;
                        }
                    }
                }
            }

            let outcome = self.session.renew_token().await;
            debug!(?outcome, "proactive renewal finished");
            if !self.session.is_authenticated() {
                return;
            }
        }
    }
}
