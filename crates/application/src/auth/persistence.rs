//! Durable cookie backup of the in-memory token pair.
//!
//! Memory is the authoritative copy. Cookies are written after every
//! memory write and read only when memory is empty, e.g. after a restart.

use std::sync::Arc;

use chrono::Duration;
use tessera_domain::{Cookie, TokenPair};
use tokio::sync::Mutex;

use crate::config::SessionConfig;
use crate::ports::{Clock, CookieStore, StorageError};

/// Cookie holding the access token.
pub const ACCESS_COOKIE: &str = "auth_token";

/// Cookie holding the refresh token.
pub const REFRESH_COOKIE: &str = "auth_refresh_token";

/// Token values found in the durable store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedTokens {
    /// Access token cookie value.
    pub access: Option<String>,
    /// Refresh token cookie value.
    pub refresh: Option<String>,
}

impl PersistedTokens {
    /// Returns true if both cookies are present.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.access.is_some() && self.refresh.is_some()
    }
}

/// Writes and reads the token pair as cookies.
///
/// Writes and clears of one persistence (and its clones) never interleave,
/// so a clear cannot land between the two cookies of a write.
#[derive(Clone)]
pub struct TokenPersistence {
    cookies: Arc<dyn CookieStore>,
    gate: Arc<Mutex<()>>,
    clock: Arc<dyn Clock>,
    default_max_age: Duration,
    max_age_limit: Duration,
    secure: bool,
}

impl TokenPersistence {
    /// Create persistence over a cookie store.
    #[must_use]
    pub fn new(cookies: Arc<dyn CookieStore>, clock: Arc<dyn Clock>, config: &SessionConfig) -> Self {
        Self {
            cookies,
            gate: Arc::new(Mutex::new(())),
            clock,
            default_max_age: to_chrono(config.refresh_cookie_max_age),
            max_age_limit: to_chrono(config.refresh_cookie_max_age_limit),
            secure: config.secure_cookies,
        }
    }

    /// Persist both tokens.
    ///
    /// The access cookie has no explicit max-age and relies on the token's
    /// own expiry. The refresh cookie lives as long as the refresh token
    /// says, clamped between the configured default and limit.
    ///
    /// # Errors
    ///
    /// Returns the store's error if a cookie cannot be written.
    pub async fn write(&self, pair: &TokenPair) -> Result<(), StorageError> {
        self.write_if(pair, || true).await.map(drop)
    }

    /// Persist both tokens if `still_current` holds once no clear can run.
    ///
    /// Returns whether the pair was written.
    ///
    /// # Errors
    ///
    /// Returns the store's error if a cookie cannot be written.
    pub async fn write_if(
        &self,
        pair: &TokenPair,
        still_current: impl FnOnce() -> bool + Send,
    ) -> Result<bool, StorageError> {
        let _gate = self.gate.lock().await;
        if !still_current() {
            return Ok(false);
        }
        self.cookies
            .set(Cookie::new(ACCESS_COOKIE, pair.access_token()).with_secure(self.secure))
            .await?;
        self.cookies
            .set(
                Cookie::new(REFRESH_COOKIE, pair.refresh_token())
                    .with_max_age(self.refresh_max_age(pair))
                    .with_secure(self.secure),
            )
            .await?;
        Ok(true)
    }

    /// Read whatever tokens the durable store holds.
    pub async fn read(&self) -> PersistedTokens {
        PersistedTokens {
            access: self.cookies.get(ACCESS_COOKIE).await,
            refresh: self.cookies.get(REFRESH_COOKIE).await,
        }
    }

    /// Expire both cookies immediately.
    ///
    /// # Errors
    ///
    /// Returns the first store error; the second cookie is still attempted.
    pub async fn clear(&self) -> Result<(), StorageError> {
        let _gate = self.gate.lock().await;
        let access = self.cookies.set(Cookie::expired(ACCESS_COOKIE)).await;
        let refresh = self.cookies.set(Cookie::expired(REFRESH_COOKIE)).await;
        access.and(refresh)
    }

    fn refresh_max_age(&self, pair: &TokenPair) -> Duration {
        let remaining = pair
            .refresh()
            .claims()
            .and_then(tessera_domain::Claims::expires_at)
            .map(|expires_at| expires_at - self.clock.now());

        match remaining {
            Some(remaining) => remaining.clamp(self.default_max_age, self.max_age_limit),
            None => self.default_max_age,
        }
    }
}

impl std::fmt::Debug for TokenPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPersistence")
            .field("default_max_age", &self.default_max_age)
            .field("max_age_limit", &self.max_age_limit)
            .finish_non_exhaustive()
    }
}

fn to_chrono(duration: std::time::Duration) -> Duration {
    Duration::from_std(duration).unwrap_or(Duration::MAX)
}
