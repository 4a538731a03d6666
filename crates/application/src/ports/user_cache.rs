//! Cached "current user" query port

use tessera_domain::User;
use tokio::sync::broadcast;

/// Change notifications of the cached current user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCacheEvent {
    /// A user was loaded or replaced.
    Updated,
    /// The cached user was removed.
    Invalidated,
}

/// Port for the cached current-user result.
pub trait CurrentUserCache: Send + Sync {
    /// The cached user, if loaded.
    fn current(&self) -> Option<User>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<UserCacheEvent>;
}
