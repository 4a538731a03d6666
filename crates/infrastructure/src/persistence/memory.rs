//! In-memory cookie and session storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tessera_application::ports::{Clock, CookieStore, SessionStorage, StorageError};
use tessera_domain::Cookie;

use super::jar::CookieJar;

/// Cookie store living as long as the process.
pub struct MemoryCookieStore {
    jar: Mutex<CookieJar>,
    clock: Arc<dyn Clock>,
}

impl MemoryCookieStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            jar: Mutex::new(CookieJar::default()),
            clock,
        }
    }
}

#[async_trait]
impl CookieStore for MemoryCookieStore {
    async fn get(&self, name: &str) -> Option<String> {
        self.jar
            .lock()
            .get(name, self.clock.now())
            .map(str::to_string)
    }

    async fn set(&self, cookie: Cookie) -> Result<(), StorageError> {
        self.jar.lock().apply(cookie, self.clock.now());
        Ok(())
    }
}

impl std::fmt::Debug for MemoryCookieStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCookieStore")
            .field("cookies", &self.jar.lock().len())
            .finish_non_exhaustive()
    }
}

/// Session-scoped key/value storage; gone when the process exits.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.lock().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SystemClock;

    #[tokio::test]
    async fn test_memory_cookie_store() {
        let store = MemoryCookieStore::new(Arc::new(SystemClock));
        assert!(store.get("auth_token").await.is_none());

        store.set(Cookie::new("auth_token", "a.b.c")).await.ok();
        assert_eq!(store.get("auth_token").await.as_deref(), Some("a.b.c"));

        store.set(Cookie::expired("auth_token")).await.ok();
        assert!(store.get("auth_token").await.is_none());
    }

    #[test]
    fn test_session_storage() {
        let storage = MemorySessionStorage::new();
        storage.set("auth_email", "a@x.com");
        assert_eq!(storage.get("auth_email").as_deref(), Some("a@x.com"));
        storage.remove("auth_email");
        assert!(storage.get("auth_email").is_none());
    }
}
