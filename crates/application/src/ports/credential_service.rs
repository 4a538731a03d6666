//! Credential service port

use async_trait::async_trait;
use tessera_domain::User;

use super::RemoteResult;

/// Tokens as issued by the server, before local validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedTokens {
    /// Access token.
    pub access_token: String,
    /// Refresh token; renewals may omit it when the server does not rotate.
    pub refresh_token: Option<String>,
}

/// Answer of the credential service to any call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialResponse {
    /// The server accepted the call.
    pub success: bool,
    /// Human readable message.
    pub message: Option<String>,
    /// Issued tokens, if any.
    pub tokens: Option<IssuedTokens>,
    /// The user the tokens belong to, if reported.
    pub user: Option<User>,
    /// A password change is mandatory before tokens are issued.
    pub must_change_password: bool,
    /// The password expired.
    pub password_expired: bool,
    /// Ticket authorizing the mandatory password change.
    pub change_ticket: Option<String>,
}

impl CredentialResponse {
    /// A bare success answer.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// A failure answer with a message.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Attach issued tokens.
    #[must_use]
    pub fn with_tokens(mut self, access: impl Into<String>, refresh: Option<String>) -> Self {
        self.tokens = Some(IssuedTokens {
            access_token: access.into(),
            refresh_token: refresh,
        });
        self
    }

    /// Attach the user.
    #[must_use]
    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    /// The message, or `fallback` when the server sent none.
    #[must_use]
    pub fn message_or(&self, fallback: &str) -> String {
        self.message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Port for the remote credential-check and token-issuance service.
///
/// Implementations convert non-success HTTP answers that carry a readable
/// body into `Ok(CredentialResponse { success: false, .. })`; only
/// transport failures surface as `Err`.
#[async_trait]
pub trait CredentialService: Send + Sync {
    /// Check email and password; success starts the second-factor step.
    async fn login(&self, email: &str, password: &str) -> RemoteResult<CredentialResponse>;

    /// Confirm the one-time code and obtain tokens.
    async fn confirm_second_factor(&self, email: &str, code: &str)
    -> RemoteResult<CredentialResponse>;

    /// Set a new password, optionally authorized by a ticket.
    async fn change_password(
        &self,
        email: &str,
        new_password: &str,
        ticket: Option<&str>,
    ) -> RemoteResult<CredentialResponse>;

    /// Start password recovery.
    async fn forgot_password(&self, email: &str) -> RemoteResult<CredentialResponse>;

    /// Exchange a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> RemoteResult<CredentialResponse>;

    /// Invalidate one refresh token.
    async fn logout(&self, refresh_token: &str) -> RemoteResult<CredentialResponse>;

    /// Invalidate every session of the user owning the refresh token.
    async fn logout_all(&self, refresh_token: &str) -> RemoteResult<CredentialResponse>;

    /// Lightweight check that the access token still grants access.
    async fn verify_access(&self, access_token: &str) -> RemoteResult<CredentialResponse>;
}
