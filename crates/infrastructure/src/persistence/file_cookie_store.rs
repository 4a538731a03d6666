//! File-based cookie store.
//!
//! Cookies are kept in a JSON file so they survive restarts:
//! ```json
//! {
//!   "auth_refresh_token": {
//!     "name": "auth_refresh_token",
//!     "value": "...",
//!     "path": "/",
//!     "max_age_secs": 604800,
//!     "same_site": "lax",
//!     "secure": false,
//!     "expires_at": "2026-01-08T10:00:00Z"
//!   }
//! }
//! ```
//! The file is re-read on every access so that changes made by another
//! process (a logout elsewhere) become visible to the next poll.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tessera_application::ports::{Clock, CookieStore, StorageError};
use tessera_domain::Cookie;
use tokio::fs;
use tokio::sync::Mutex;

use super::jar::CookieJar;

/// Cookie store backed by a JSON file.
pub struct FileCookieStore {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileCookieStore {
    /// Store cookies in `path`. The file and its directory are created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the cookie file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<CookieJar, StorageError> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(CookieJar::default()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::Corrupt(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CookieJar::default()),
            Err(e) => Err(io_error(&self.path, &e)),
        }
    }

    async fn save(&self, jar: &CookieJar) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, &e))?;
        }

        let mut json = serde_json::to_string_pretty(jar)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        json.push('\n');

        // Write then rename so readers never see a half-written file.
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json)
            .await
            .map_err(|e| io_error(&staging, &e))?;
        fs::rename(&staging, &self.path)
            .await
            .map_err(|e| io_error(&self.path, &e))
    }
}

fn io_error(path: &Path, error: &std::io::Error) -> StorageError {
    StorageError::Io(format!("{}: {error}", path.display()))
}

#[async_trait]
impl CookieStore for FileCookieStore {
    async fn get(&self, name: &str) -> Option<String> {
        match self.load().await {
            Ok(jar) => jar.get(name, self.clock.now()).map(str::to_string),
            Err(e) => {
                tracing::warn!(error = %e, "cookie file unreadable, treating as empty");
                None
            }
        }
    }

    async fn set(&self, cookie: Cookie) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let now = self.clock.now();
        let mut jar = match self.load().await {
            Ok(jar) => jar,
            Err(StorageError::Corrupt(reason)) => {
                tracing::warn!(%reason, "discarding corrupt cookie file");
                CookieJar::default()
            }
            Err(e) => return Err(e),
        };
        jar.purge_expired(now);
        jar.apply(cookie, now);
        self.save(&jar).await
    }
}

impl std::fmt::Debug for FileCookieStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCookieStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
