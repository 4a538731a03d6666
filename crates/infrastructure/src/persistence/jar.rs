//! Cookie jar semantics shared by the cookie store adapters.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_domain::Cookie;

/// A cookie with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    /// The cookie as written.
    #[serde(flatten)]
    pub cookie: Cookie,
    /// Absolute expiry; `None` lives until removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredCookie {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

/// Cookies by name. Keys are sorted so the file form is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookieJar {
    cookies: BTreeMap<String, StoredCookie>,
}

impl CookieJar {
    /// Value of `name` if present and not expired at `now`.
    #[must_use]
    pub fn get(&self, name: &str, now: DateTime<Utc>) -> Option<&str> {
        self.cookies
            .get(name)
            .filter(|stored| stored.is_live(now))
            .map(|stored| stored.cookie.value.as_str())
    }

    /// Write `cookie`; a zero or negative max-age removes it.
    pub fn apply(&mut self, cookie: Cookie, now: DateTime<Utc>) {
        if cookie.is_deletion() {
            self.cookies.remove(&cookie.name);
            return;
        }
        let expires_at = cookie.expires_at(now);
        self.cookies
            .insert(cookie.name.clone(), StoredCookie { cookie, expires_at });
    }

    /// Drop expired cookies. Returns true if anything was removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> bool {
        let before = self.cookies.len();
        self.cookies.retain(|_, stored| stored.is_live(now));
        self.cookies.len() != before
    }

    /// Number of stored cookies, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Returns true if the jar is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}
