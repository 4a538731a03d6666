//! Cookie types for durable credential storage.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A cookie to be written to the durable store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Path the cookie applies to.
    #[serde(default = "default_path")]
    pub path: String,
    /// Lifetime in seconds; `None` relies on the value's own expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_secs: Option<i64>,
    /// SameSite attribute.
    #[serde(default)]
    pub same_site: SameSite,
    /// Secure flag.
    #[serde(default)]
    pub secure: bool,
}

fn default_path() -> String {
    "/".to_string()
}

impl Cookie {
    /// Create a `path=/`, `SameSite=Lax` cookie without explicit max-age.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: default_path(),
            max_age_secs: None,
            same_site: SameSite::Lax,
            secure: false,
        }
    }

    /// A cookie that expires immediately, deleting any stored value.
    #[must_use]
    pub fn expired(name: impl Into<String>) -> Self {
        Self::new(name, "").with_max_age(Duration::zero())
    }

    /// Set the max-age.
    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age_secs = Some(max_age.num_seconds());
        self
    }

    /// Set Secure flag.
    #[must_use]
    pub const fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Returns true if writing this cookie deletes it.
    #[must_use]
    pub fn is_deletion(&self) -> bool {
        self.max_age_secs.is_some_and(|secs| secs <= 0)
    }

    /// Absolute expiry for a cookie written at `now`, `None` for no explicit max-age.
    ///
    /// A max-age beyond the representable range counts as no expiry.
    #[must_use]
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.max_age_secs
            .and_then(Duration::try_seconds)
            .and_then(|max_age| now.checked_add_signed(max_age))
    }

    /// Format as a `Set-Cookie` header value.
    #[must_use]
    pub fn to_set_cookie_header(&self) -> String {
        let mut header = format!(
            "{}={}; path={}; SameSite={}",
            self.name,
            self.value,
            self.path,
            self.same_site.display_name()
        );
        if let Some(secs) = self.max_age_secs {
            header.push_str(&format!("; max-age={secs}"));
        }
        if self.secure {
            header.push_str("; Secure");
        }
        header
    }
}

/// SameSite attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    /// Cookies are sent with all requests.
    None,
    /// Cookies are sent with top-level navigations and GET from third-party sites.
    #[default]
    Lax,
    /// Cookies are only sent in first-party context.
    Strict,
}

impl SameSite {
    /// Get human-readable name.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Lax => "Lax",
            Self::Strict => "Strict",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_session_cookie_header() {
        let cookie = Cookie::new("auth_token", "a.b.c");
        assert_eq!(
            cookie.to_set_cookie_header(),
            "auth_token=a.b.c; path=/; SameSite=Lax"
        );
        assert!(cookie.expires_at(Utc::now()).is_none());
    }

    #[test]
    fn test_max_age_cookie_header() {
        let cookie = Cookie::new("auth_refresh_token", "d.e.f").with_max_age(Duration::days(7));
        assert_eq!(
            cookie.to_set_cookie_header(),
            "auth_refresh_token=d.e.f; path=/; SameSite=Lax; max-age=604800"
        );
        assert!(!cookie.is_deletion());
    }

    #[test]
    fn test_oversized_max_age_never_expires() {
        let mut cookie = Cookie::new("auth_refresh_token", "d.e.f");
        cookie.max_age_secs = Some(i64::MAX);
        assert!(cookie.expires_at(Utc::now()).is_none());
    }

    #[test]
    fn test_expired_cookie_is_deletion() {
        let cookie = Cookie::expired("auth_token");
        assert!(cookie.is_deletion());
        assert!(cookie.value.is_empty());
    }
}
