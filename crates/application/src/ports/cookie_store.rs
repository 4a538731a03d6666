//! Durable cookie storage port

use async_trait::async_trait;
use tessera_domain::Cookie;
use thiserror::Error;

/// Cookie storage failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Reading or writing the backing medium failed.
    #[error("storage I/O failed: {0}")]
    Io(String),

    /// Stored data could not be decoded.
    #[error("corrupt storage: {0}")]
    Corrupt(String),
}

/// Port for the durable cookie jar.
///
/// Writing a cookie whose max-age is zero or negative deletes it.
#[async_trait]
pub trait CookieStore: Send + Sync {
    /// Value of a live cookie.
    async fn get(&self, name: &str) -> Option<String>;

    /// Write (or delete) a cookie.
    async fn set(&self, cookie: Cookie) -> Result<(), StorageError>;
}
