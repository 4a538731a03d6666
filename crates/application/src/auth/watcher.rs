//! Cross-checks the durable token store against the cached current user.
//!
//! The in-memory session flag can outlive cookies cleared by another
//! process. The watcher derives a stricter flag from what is actually
//! persisted and what the user cache holds.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::persistence::TokenPersistence;
use crate::config::SessionConfig;
use crate::ports::CurrentUserCache;
use crate::task::TaskHandle;

/// Observed authentication evidence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchState {
    /// Both token cookies are present.
    pub cookies_present: bool,
    /// The user cache holds a current user.
    pub user_loaded: bool,
}

impl WatchState {
    /// Authenticated only when both cookies and a loaded user are present.
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        self.cookies_present && self.user_loaded
    }
}

/// Publishes [`WatchState`] from a cookie poll and cache notifications.
#[derive(Clone)]
pub struct ConsistencyWatcher {
    persistence: TokenPersistence,
    cache: Arc<dyn CurrentUserCache>,
    poll_interval: std::time::Duration,
    state: Arc<watch::Sender<WatchState>>,
}

impl ConsistencyWatcher {
    /// Create a watcher. Nothing runs until [`ConsistencyWatcher::spawn`].
    #[must_use]
    pub fn new(
        persistence: TokenPersistence,
        cache: Arc<dyn CurrentUserCache>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            persistence,
            cache,
            poll_interval: config.cookie_poll_interval,
            state: Arc::new(watch::Sender::new(WatchState::default())),
        }
    }

    /// Current evidence.
    #[must_use]
    pub fn state(&self) -> WatchState {
        *self.state.borrow()
    }

    /// The externally visible authenticated flag.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    /// Subscribe to evidence changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WatchState> {
        self.state.subscribe()
    }

    /// Start the cookie poll and the cache subscriber.
    #[must_use]
    pub fn spawn(&self) -> [TaskHandle; 2] {
        [self.spawn_cookie_poll(), self.spawn_cache_subscriber()]
    }

    /// Start only the cookie poll.
    #[must_use]
    pub fn spawn_cookie_poll(&self) -> TaskHandle {
        let watcher = self.clone();
        TaskHandle::spawn("cookie-poll", async move {
            let mut ticker = tokio::time::interval(watcher.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                watcher.poll_cookies().await;
            }
        })
    }

    /// Start only the cache subscriber.
    #[must_use]
    pub fn spawn_cache_subscriber(&self) -> TaskHandle {
        let watcher = self.clone();
        let mut events = self.cache.subscribe();
        TaskHandle::spawn("user-cache-subscriber", async move {
            watcher.recompute().await;
            loop {
                match events.recv().await {
                    Ok(event) => debug!(?event, "user cache changed"),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "user cache events lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
                watcher.recompute().await;
            }
        })
    }

    /// Re-read cookies and update the flag if it changed.
    pub async fn poll_cookies(&self) {
        let present = self.persistence.read().await.is_complete();
        self.publish(|state| state.cookies_present = present);
    }

    /// Re-read both sources.
    pub async fn recompute(&self) {
        let present = self.persistence.read().await.is_complete();
        let loaded = self.cache.current().is_some();
        self.publish(|state| {
            state.cookies_present = present;
            state.user_loaded = loaded;
        });
    }

    fn publish(&self, change: impl FnOnce(&mut WatchState)) {
        self.state.send_if_modified(|state| {
            let before = *state;
            change(state);
            if *state == before {
                return false;
            }
            info!(
                cookies_present = state.cookies_present,
                user_loaded = state.user_loaded,
                authenticated = state.is_authenticated(),
                "authentication evidence changed"
            );
            true
        });
    }
}

impl std::fmt::Debug for ConsistencyWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsistencyWatcher")
            .field("poll_interval", &self.poll_interval)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
