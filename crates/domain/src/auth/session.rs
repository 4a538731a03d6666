//! Session state snapshot and the authenticated user.

use serde::{Deserialize, Serialize};

use super::token::{Claims, TokenPair};

/// The authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Server-side user id.
    pub id: String,
    /// Login email.
    pub email: String,
    /// Display name.
    #[serde(default)]
    pub full_name: String,
    /// Role name.
    #[serde(default)]
    pub role: String,
    /// The password has to be changed before normal use.
    #[serde(default)]
    pub must_change_password: bool,
    /// The email address was confirmed.
    #[serde(default)]
    pub email_confirmed: bool,
    /// The account is active.
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

impl User {
    /// Build a user from access token claims.
    ///
    /// Returns `None` if the claims carry neither a subject nor an email.
    #[must_use]
    pub fn from_claims(claims: &Claims) -> Option<Self> {
        let id = claims.sub.clone().or_else(|| claims.email.clone())?;
        Some(Self {
            email: claims.email.clone().unwrap_or_default(),
            full_name: claims.name.clone().unwrap_or_default(),
            role: claims.role.clone().unwrap_or_default(),
            must_change_password: claims.must_change_password.unwrap_or(false),
            email_confirmed: claims.email_confirmed.unwrap_or(false),
            active: claims.active.unwrap_or(true),
            id,
        })
    }

    /// Minimal user known only by email.
    #[must_use]
    pub fn with_email(email: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            id: email.clone(),
            email,
            full_name: String::new(),
            role: String::new(),
            must_change_password: false,
            email_confirmed: false,
            active: true,
        }
    }
}

/// Where the session is in the login state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No credentials.
    #[default]
    Anonymous,
    /// Password accepted, waiting for the one-time code.
    AwaitingSecondFactor,
    /// A password change is mandatory before tokens are issued.
    PasswordChangeRequired,
    /// Tokens issued and user known.
    Authenticated,
}

impl SessionPhase {
    /// Returns true if this phase is part of an unfinished login.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::AwaitingSecondFactor | Self::PasswordChangeRequired)
    }
}

/// Why a session was ended locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogoutReason {
    /// The user asked to log out.
    UserRequested,
    /// The server reported the refresh token as expired or invalid.
    SessionExpired,
    /// The server reported that the password expired.
    PasswordExpired,
    /// The server issued a token that failed local validation.
    InvalidToken,
    /// Renewal failed in an unexpected way.
    Critical,
}

impl LogoutReason {
    /// Notice to show on the login page, if any.
    #[must_use]
    pub const fn notice(self) -> Option<&'static str> {
        match self {
            Self::UserRequested => None,
            Self::SessionExpired => Some("Your session has expired. Please sign in again."),
            Self::PasswordExpired => {
                Some("Your password has expired. Please sign in and choose a new password.")
            }
            Self::InvalidToken => Some("The server returned invalid credentials. Please sign in again."),
            Self::Critical => Some("Your session ended unexpectedly. Please sign in again."),
        }
    }
}

/// Snapshot of the client session.
///
/// `is_authenticated()` implies `user()` and `access_token()` are present:
/// the only transition into [`SessionPhase::Authenticated`] is
/// [`Session::authenticate`], which takes both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    phase: SessionPhase,
    user: Option<User>,
    tokens: Option<TokenPair>,
    error: Option<String>,
    loading: u32,
}

impl Session {
    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Returns true once tokens were issued and the user is known.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Authenticated
    }

    /// Returns true while at least one operation is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading > 0
    }

    /// The authenticated user.
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Last user-visible error.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// In-memory token pair.
    #[must_use]
    pub const fn tokens(&self) -> Option<&TokenPair> {
        self.tokens.as_ref()
    }

    /// In-memory access token.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.tokens.as_ref().map(TokenPair::access_token)
    }

    /// In-memory refresh token.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.tokens.as_ref().map(TokenPair::refresh_token)
    }

    /// Install a token pair and user together and mark the session authenticated.
    pub fn authenticate(&mut self, user: User, tokens: TokenPair) {
        self.user = Some(user);
        self.tokens = Some(tokens);
        self.phase = SessionPhase::Authenticated;
        self.error = None;
    }

    /// Load tokens recovered from durable storage without authenticating.
    pub fn restore_tokens(&mut self, tokens: TokenPair) {
        self.tokens = Some(tokens);
    }

    /// Move to the second-factor step.
    pub fn await_second_factor(&mut self) {
        self.phase = SessionPhase::AwaitingSecondFactor;
    }

    /// Move to the mandatory password change step.
    pub fn require_password_change(&mut self) {
        self.phase = SessionPhase::PasswordChangeRequired;
        self.user = None;
        self.tokens = None;
    }

    /// Drop user and tokens and return to [`SessionPhase::Anonymous`].
    ///
    /// The loading counter is preserved: operations still in flight clear
    /// their own share when they finish.
    pub fn reset(&mut self) {
        self.phase = SessionPhase::Anonymous;
        self.user = None;
        self.tokens = None;
        self.error = None;
    }

    /// Record a user-visible error.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Clear the user-visible error.
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// An operation started.
    pub const fn begin_loading(&mut self) {
        self.loading = self.loading.saturating_add(1);
    }

    /// An operation finished.
    pub const fn end_loading(&mut self) {
        self.loading = self.loading.saturating_sub(1);
    }
}
