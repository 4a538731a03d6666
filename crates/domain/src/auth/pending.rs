//! Data carried between the steps of a multi-step login.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Which flow a pending login belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthContextKind {
    /// Regular password + second factor login.
    #[default]
    Login,
    /// "Forgot password" flow.
    PasswordRecovery,
    /// The server reported the password as expired.
    PasswordExpired,
    /// The server requires a password reset before issuing tokens.
    PasswordReset,
}

impl AuthContextKind {
    /// Returns the tag as stored in session-scoped storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::PasswordRecovery => "password_recovery",
            Self::PasswordExpired => "password_expired",
            Self::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for AuthContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthContextKind {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s {
            "login" => Ok(Self::Login),
            "password_recovery" => Ok(Self::PasswordRecovery),
            "password_expired" => Ok(Self::PasswordExpired),
            "password_reset" => Ok(Self::PasswordReset),
            other => Err(DomainError::UnknownAuthContext(other.to_string())),
        }
    }
}

/// Ephemeral cross-step login data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuthContext {
    /// Email entered in the first step.
    pub email: String,
    /// Flow tag.
    pub kind: AuthContextKind,
    /// Ticket authorizing a password change, if the server issued one.
    pub change_ticket: Option<String>,
}

impl PendingAuthContext {
    /// Context without a password change ticket.
    #[must_use]
    pub fn new(email: impl Into<String>, kind: AuthContextKind) -> Self {
        Self {
            email: email.into(),
            kind,
            change_ticket: None,
        }
    }

    /// Attach a password change ticket.
    #[must_use]
    pub fn with_ticket(mut self, ticket: Option<String>) -> Self {
        self.change_ticket = ticket;
        self
    }
}
