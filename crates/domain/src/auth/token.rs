//! Token shape validation and claim decoding.
//!
//! Access tokens are always JWTs. Refresh tokens may be JWTs or opaque
//! blobs drawn from the base64 alphabet, so parsing yields a [`Token`]
//! that distinguishes the two without ever failing loudly.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Opaque tokens must be strictly longer than this.
const OPAQUE_MIN_LEN: usize = 20;

/// Default window before `exp` in which a token counts as expiring, in seconds.
pub const DEFAULT_EXPIRY_THRESHOLD_SECS: i64 = 300;

/// Claims carried in the payload segment of a JWT.
///
/// Every field is read on its own: a claim of an unexpected JSON type
/// becomes `None` instead of spoiling the rest of the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id). Numeric subjects are kept as their decimal text.
    #[serde(default, deserialize_with = "lenient::text")]
    pub sub: Option<String>,
    /// Expiry as seconds since the epoch.
    #[serde(default, deserialize_with = "lenient::seconds")]
    pub exp: Option<i64>,
    /// Issued-at as seconds since the epoch.
    #[serde(default, deserialize_with = "lenient::seconds")]
    pub iat: Option<i64>,
    /// Email address of the subject.
    #[serde(default, deserialize_with = "lenient::text")]
    pub email: Option<String>,
    /// Display name of the subject.
    #[serde(
        default,
        alias = "fullName",
        alias = "full_name",
        deserialize_with = "lenient::text"
    )]
    pub name: Option<String>,
    /// Role of the subject.
    #[serde(default, deserialize_with = "lenient::text")]
    pub role: Option<String>,
    /// Whether the subject has to change the password before continuing.
    #[serde(
        default,
        alias = "mustChangePassword",
        deserialize_with = "lenient::flag"
    )]
    pub must_change_password: Option<bool>,
    /// Whether the email address was confirmed.
    #[serde(default, alias = "emailConfirmed", deserialize_with = "lenient::flag")]
    pub email_confirmed: Option<bool>,
    /// Whether the account is active.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub active: Option<bool>,
}

impl Claims {
    /// Expiry instant, if the token declares one.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }
}

/// A parsed credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Three non-empty dot-separated segments.
    ///
    /// `claims` is `None` when the payload segment is not decodable JSON;
    /// the shape is still valid.
    Jwt {
        /// The raw token string.
        raw: String,
        /// Decoded payload claims.
        claims: Option<Claims>,
    },
    /// An opaque base64-alphabet blob.
    Opaque {
        /// The raw token string.
        raw: String,
    },
}

impl Token {
    /// Parse a raw token string.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidTokenFormat`] if the string is neither
    /// JWT-shaped nor a base64-alphabet string longer than 20 characters.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let segments: Vec<&str> = raw.split('.').collect();
        if segments.len() == 3 && segments.iter().all(|s| !s.is_empty()) {
            return Ok(Self::Jwt {
                raw: raw.to_string(),
                claims: decode_segment(segments[1]),
            });
        }

        if raw.len() > OPAQUE_MIN_LEN && raw.chars().all(is_base64_char) {
            return Ok(Self::Opaque {
                raw: raw.to_string(),
            });
        }

        Err(DomainError::InvalidTokenFormat(preview(raw)))
    }

    /// The raw token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Jwt { raw, .. } | Self::Opaque { raw } => raw,
        }
    }

    /// Decoded claims, if this is a JWT with a readable payload.
    #[must_use]
    pub const fn claims(&self) -> Option<&Claims> {
        match self {
            Self::Jwt { claims, .. } => claims.as_ref(),
            Self::Opaque { .. } => None,
        }
    }

    /// Returns true for JWT-shaped tokens.
    #[must_use]
    pub const fn is_jwt(&self) -> bool {
        matches!(self, Self::Jwt { .. })
    }
}

/// Returns true if the token is JWT-shaped or a valid opaque token.
#[must_use]
pub fn validate_format(token: &str) -> bool {
    Token::parse(token).is_ok()
}

/// Decode the payload claims of a JWT-shaped token.
///
/// Never fails: any decode problem yields `None`.
#[must_use]
pub fn decode_claims(token: &str) -> Option<Claims> {
    let mut segments = token.split('.');
    let (_, payload, _) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }
    decode_segment(payload)
}

/// Returns true if the token expires within `threshold` of `now`.
///
/// Undecodable tokens, and tokens without an `exp` claim, are treated as
/// expiring.
#[must_use]
pub fn is_near_expiry(token: &str, threshold: Duration, now: DateTime<Utc>) -> bool {
    decode_claims(token)
        .and_then(|claims| claims.expires_at())
        .is_none_or(|expires_at| {
            expires_at
                .checked_sub_signed(threshold)
                .is_none_or(|deadline| now >= deadline)
        })
}

/// Short, log-safe preview of a token (first 8 chars + ...).
#[must_use]
pub fn preview(token: &str) -> String {
    if token.len() > 12 && token.is_char_boundary(8) {
        format!("{}...", &token[..8])
    } else {
        "***".to_string()
    }
}

fn decode_segment(segment: &str) -> Option<Claims> {
    let trimmed = segment.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

const fn is_base64_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=' | '-' | '_')
}

/// Claim readers that map a type mismatch to `None`.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Bool(b) => Some(b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        })
    }
}

/// An access/refresh token pair that passed format validation.
///
/// The only way to obtain a pair is through [`TokenPair::new`], so an
/// invalid token can never reach storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    access: Token,
    refresh: Token,
}

impl TokenPair {
    /// Validate both tokens and build a pair.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidTokenFormat`] if either token fails
    /// format validation.
    pub fn new(access: impl AsRef<str>, refresh: impl AsRef<str>) -> DomainResult<Self> {
        Ok(Self {
            access: Token::parse(access.as_ref())?,
            refresh: Token::parse(refresh.as_ref())?,
        })
    }

    /// The access token string.
    #[must_use]
    pub fn access_token(&self) -> &str {
        self.access.as_str()
    }

    /// The refresh token string.
    #[must_use]
    pub fn refresh_token(&self) -> &str {
        self.refresh.as_str()
    }

    /// The parsed access token.
    #[must_use]
    pub const fn access(&self) -> &Token {
        &self.access
    }

    /// The parsed refresh token.
    #[must_use]
    pub const fn refresh(&self) -> &Token {
        &self.refresh
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.access_token())
    }
}
