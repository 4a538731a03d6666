//! In-memory cache of the current user with change notifications.

use parking_lot::RwLock;
use tessera_application::ports::{CurrentUserCache, UserCacheEvent};
use tessera_domain::User;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 16;

/// Holds the last loaded current user and broadcasts every change.
#[derive(Debug)]
pub struct InMemoryUserCache {
    user: RwLock<Option<User>>,
    events: broadcast::Sender<UserCacheEvent>,
}

impl InMemoryUserCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            user: RwLock::new(None),
            events,
        }
    }

    /// Replace the cached user. Notifies subscribers only on change.
    pub fn set(&self, user: Option<User>) {
        let event = {
            let mut current = self.user.write();
            if *current == user {
                return;
            }
            *current = user;
            if current.is_some() {
                UserCacheEvent::Updated
            } else {
                UserCacheEvent::Invalidated
            }
        };
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Drop the cached user.
    pub fn invalidate(&self) {
        self.set(None);
    }
}

impl Default for InMemoryUserCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CurrentUserCache for InMemoryUserCache {
    fn current(&self) -> Option<User> {
        self.user.read().clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<UserCacheEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_changes_are_broadcast() {
        let cache = InMemoryUserCache::new();
        let mut events = cache.subscribe();

        cache.set(Some(User::with_email("a@x.com")));
        cache.set(Some(User::with_email("a@x.com")));
        cache.invalidate();

        assert_eq!(events.recv().await.ok(), Some(UserCacheEvent::Updated));
        assert_eq!(events.recv().await.ok(), Some(UserCacheEvent::Invalidated));
        assert!(events.try_recv().is_err());
        assert!(cache.current().is_none());
    }
}
