//! Central authority for session state.
//!
//! Every state change goes through one of the operations below. The state
//! itself lives in a `watch` channel so readers get a consistent snapshot
//! and subscribers (the renewal timer, the UI) see every transition.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tessera_domain::auth::token;
use tessera_domain::{
    AuthContextKind, LogoutReason, PendingAuthContext, Session, Token, TokenPair, User,
};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::error::AuthError;
use super::pending::PendingAuthStore;
use super::persistence::TokenPersistence;
use super::single_flight::SingleFlight;
use crate::config::SessionConfig;
use crate::ports::{Clock, CredentialResponse, CredentialService, IssuedTokens, Navigator};

/// What a second-factor confirmation led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondFactorOutcome {
    /// Tokens were issued and stored.
    Authenticated,
    /// The server demands a password change first.
    PasswordChangeRequired,
}

/// What a password change led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordChangeOutcome {
    /// Tokens were issued and stored.
    Authenticated,
    /// The password changed but no tokens were issued; sign in again.
    SignInRequired,
}

/// Result of a renewal attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewOutcome {
    /// A new access token is stored.
    Renewed,
    /// No refresh token exists; nothing was sent.
    NoRefreshToken,
    /// The server answered with a token that failed validation.
    InvalidToken,
    /// The server refused for an unclear or transient reason; the session is kept.
    Deferred,
    /// The session was reset while the call was in flight; the answer was dropped.
    Stale,
    /// The session was ended.
    LoggedOut(LogoutReason),
}

impl RenewOutcome {
    /// Returns true if a fresh access token is in place.
    #[must_use]
    pub const fn is_renewed(self) -> bool {
        matches!(self, Self::Renewed)
    }
}

/// Shared handle to the session.
///
/// Cloning is cheap; all clones observe and mutate the same session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    state: watch::Sender<Session>,
    epoch: AtomicU64,
    credentials: Arc<dyn CredentialService>,
    persistence: TokenPersistence,
    pending: PendingAuthStore,
    navigator: Arc<dyn Navigator>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    renewal: SingleFlight<RenewOutcome>,
}

/// Keeps `is_loading` raised for the lifetime of an operation.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<Session>,
}

impl<'a> LoadingGuard<'a> {
    fn enter(state: &'a watch::Sender<Session>) -> Self {
        state.send_modify(Session::begin_loading);
        Self { state }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(Session::end_loading);
    }
}

impl SessionStore {
    /// Create an anonymous session.
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialService>,
        persistence: TokenPersistence,
        pending: PendingAuthStore,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: watch::Sender::new(Session::default()),
                epoch: AtomicU64::new(0),
                credentials,
                persistence,
                pending,
                navigator,
                clock,
                config,
                renewal: SingleFlight::new(),
            }),
        }
    }

    /// Current session snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to session changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Returns true if the session is authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// `Authorization` header value for the in-memory access token.
    #[must_use]
    pub fn bearer_header(&self) -> Option<String> {
        self.inner.state.borrow().tokens().map(TokenPair::bearer_header)
    }

    /// In-memory access token.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.inner.state.borrow().access_token().map(str::to_string)
    }

    /// Time left until the in-memory access token expires, per its `exp` claim.
    #[must_use]
    pub fn access_token_remaining(&self) -> Option<chrono::Duration> {
        let expires_at = self
            .inner
            .state
            .borrow()
            .tokens()
            .and_then(|pair| pair.access().claims())
            .and_then(tessera_domain::Claims::expires_at)?;
        Some(expires_at - self.inner.clock.now())
    }

    /// The pending login context, if a multi-step login is under way.
    #[must_use]
    pub fn pending_context(&self) -> Option<PendingAuthContext> {
        self.inner.pending.load()
    }

    /// Session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Refresh token from memory, falling back to the durable store.
    pub async fn refresh_token(&self) -> Option<String> {
        let in_memory = self.inner.state.borrow().refresh_token().map(str::to_string);
        match in_memory {
            Some(token) => Some(token),
            None => self.inner.persistence.read().await.refresh,
        }
    }

    /// First login step: check email and password.
    ///
    /// On success the email is kept as pending context and the session
    /// waits for the second factor. No tokens are issued.
    ///
    /// # Errors
    ///
    /// [`AuthError::CredentialRejected`] or [`AuthError::NetworkTransient`];
    /// the message is also stored as the session error.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let _loading = self.loading();
        self.update(Session::clear_error);

        let response = self.call(self.inner.credentials.login(email, password)).await?;
        if !response.success {
            return Err(self.fail(AuthError::CredentialRejected(
                response.message_or("Invalid email or password"),
            )));
        }

        self.inner
            .pending
            .save(&PendingAuthContext::new(email, AuthContextKind::Login));
        self.update(Session::await_second_factor);
        info!("password accepted, awaiting second factor");
        Ok(())
    }

    /// Second login step: confirm the one-time code.
    ///
    /// # Errors
    ///
    /// [`AuthError::CredentialRejected`], [`AuthError::TokenFormatInvalid`]
    /// or [`AuthError::NetworkTransient`]; the session stays unauthenticated.
    pub async fn confirm_second_factor(
        &self,
        email: &str,
        code: &str,
    ) -> Result<SecondFactorOutcome, AuthError> {
        let _loading = self.loading();
        self.update(Session::clear_error);

        let response = self
            .call(self.inner.credentials.confirm_second_factor(email, code))
            .await?;

        if response.must_change_password || response.password_expired {
            let kind = if response.password_expired {
                AuthContextKind::PasswordExpired
            } else {
                AuthContextKind::PasswordReset
            };
            self.inner.pending.save(
                &PendingAuthContext::new(email, kind).with_ticket(response.change_ticket.clone()),
            );
            self.update(Session::require_password_change);
            info!(context = %kind, "password change required before sign-in");
            return Ok(SecondFactorOutcome::PasswordChangeRequired);
        }

        if !response.success {
            return Err(self.fail(AuthError::CredentialRejected(
                response.message_or("Invalid verification code"),
            )));
        }

        self.adopt_issued(response, Some(email)).await?;
        self.inner.pending.clear();
        info!("second factor confirmed, session authenticated");
        Ok(SecondFactorOutcome::Authenticated)
    }

    /// Set a new password during a mandatory change or recovery.
    ///
    /// Without an explicit `ticket` the one from the pending context is used.
    ///
    /// # Errors
    ///
    /// [`AuthError::MissingPendingContext`] when there is neither a ticket
    /// nor a pending login; otherwise the same as
    /// [`SessionStore::confirm_second_factor`].
    pub async fn change_password(
        &self,
        email: &str,
        new_password: &str,
        ticket: Option<&str>,
    ) -> Result<PasswordChangeOutcome, AuthError> {
        let _loading = self.loading();
        self.update(Session::clear_error);

        let pending = self.inner.pending.load();
        if ticket.is_none() && pending.is_none() {
            return Err(self.fail(AuthError::MissingPendingContext));
        }
        let pending_ticket = pending.and_then(|ctx| ctx.change_ticket);
        let ticket = ticket.or(pending_ticket.as_deref());

        let response = self
            .call(self.inner.credentials.change_password(email, new_password, ticket))
            .await?;
        if !response.success {
            return Err(self.fail(AuthError::CredentialRejected(
                response.message_or("Password change failed"),
            )));
        }

        if response.tokens.is_none() {
            self.inner.pending.clear();
            self.update(Session::reset);
            info!("password changed, sign-in required");
            return Ok(PasswordChangeOutcome::SignInRequired);
        }

        self.adopt_issued(response, Some(email)).await?;
        self.inner.pending.clear();
        info!("password changed, session authenticated");
        Ok(PasswordChangeOutcome::Authenticated)
    }

    /// Start password recovery. Never touches tokens.
    ///
    /// # Errors
    ///
    /// [`AuthError::CredentialRejected`] or [`AuthError::NetworkTransient`].
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let _loading = self.loading();
        self.update(Session::clear_error);

        let response = self.call(self.inner.credentials.forgot_password(email)).await?;
        if !response.success {
            return Err(self.fail(AuthError::CredentialRejected(
                response.message_or("Password recovery failed"),
            )));
        }

        self.inner
            .pending
            .save(&PendingAuthContext::new(email, AuthContextKind::PasswordRecovery));
        Ok(())
    }

    /// End the session locally and ask the server to invalidate the
    /// refresh token in the background.
    ///
    /// Local state is cleared without waiting for the server; the detached
    /// call's failure is only logged. Calling this twice is harmless.
    pub async fn logout(&self) {
        let _loading = self.loading();
        let refresh = self.refresh_token().await;
        self.reset_local().await;

        if let Some(refresh) = refresh {
            let credentials = self.inner.credentials.clone();
            tokio::spawn(async move {
                match credentials.logout(&refresh).await {
                    Ok(response) if !response.success => {
                        warn!(message = ?response.message, "server refused logout");
                    }
                    Err(e) => warn!(error = %e, "server logout failed"),
                    Ok(_) => debug!("server logout acknowledged"),
                }
            });
        }
        info!("logged out");
    }

    /// Invalidate every session of the user, then end this one.
    ///
    /// Local state is cleared even when the server call fails.
    ///
    /// # Errors
    ///
    /// Reports the server failure after local state was cleared.
    pub async fn logout_all_sessions(&self) -> Result<(), AuthError> {
        let _loading = self.loading();
        let refresh = self.refresh_token().await;

        let result = match refresh {
            Some(refresh) => match self.inner.credentials.logout_all(&refresh).await {
                Ok(response) if response.success => Ok(()),
                Ok(response) => Err(refusal(&response, "Could not end other sessions")),
                Err(e) => Err(AuthError::from(e)),
            },
            None => Ok(()),
        };

        self.reset_local().await;
        if let Err(e) = &result {
            warn!(error = %e, "logout of all sessions failed on the server");
        }
        info!("logged out of all sessions");
        result
    }

    /// End the session and send the user to the login entry point.
    pub async fn force_logout(&self, reason: LogoutReason) {
        warn!(?reason, "forcing logout");
        self.reset_local().await;
        self.inner.navigator.redirect_to_login(reason);
    }

    /// Obtain a new access token with the refresh token.
    ///
    /// Concurrent callers share one in-flight renewal, so a rotated refresh
    /// token is never sent twice.
    pub async fn renew_token(&self) -> RenewOutcome {
        if self.refresh_token().await.is_none() {
            return RenewOutcome::NoRefreshToken;
        }
        let this = self.clone();
        self.inner
            .renewal
            .run(move || async move { this.renew_once().await })
            .await
    }

    /// Re-establish the session on resume.
    ///
    /// Returns whether the session is authenticated afterwards.
    pub async fn verify_authentication(&self) -> bool {
        let _loading = self.loading();
        let epoch = self.epoch();

        let Some(pair) = self.load_tokens().await else {
            if self.inner.state.borrow().phase().is_pending() {
                debug!("login in progress, nothing to verify yet");
                return false;
            }
            debug!("no usable tokens, session is anonymous");
            self.reset_local().await;
            return false;
        };

        let threshold = chrono::Duration::from_std(self.inner.config.expiry_threshold)
            .unwrap_or(chrono::Duration::zero());
        if token::is_near_expiry(pair.access_token(), threshold, self.inner.clock.now()) {
            debug!("access token near expiry, renewing");
            self.renew_token().await;
            return self.settle_unconfirmed();
        }

        match self.inner.credentials.verify_access(pair.access_token()).await {
            Ok(response) if response.success => {
                if self.epoch() != epoch {
                    return false;
                }
                match self.resolve_user(response.user, pair.access(), None) {
                    Some(user) => {
                        self.update(|s| s.authenticate(user, pair));
                        info!("session restored");
                        true
                    }
                    None => {
                        self.reset_local().await;
                        false
                    }
                }
            }
            Ok(_) => {
                debug!("access check refused, renewing");
                match self.renew_token().await {
                    RenewOutcome::Renewed => true,
                    RenewOutcome::LoggedOut(_) => false,
                    _ => {
                        self.reset_local().await;
                        false
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "access check failed, trying one renewal");
                self.renew_token().await;
                self.settle_unconfirmed()
            }
        }
    }

    /// Drop tokens restored from cookies that could not be confirmed.
    ///
    /// The cookies stay for a later attempt; memory holds no bearer for an
    /// unauthenticated session.
    fn settle_unconfirmed(&self) -> bool {
        self.inner.state.send_if_modified(|s| {
            if s.is_authenticated() || s.tokens().is_none() {
                return false;
            }
            debug!("renewal did not confirm restored tokens, keeping them on disk only");
            s.reset();
            true
        });
        self.is_authenticated()
    }

    async fn renew_once(&self) -> RenewOutcome {
        let _loading = self.loading();
        let epoch = self.epoch();
        let Some(refresh) = self.refresh_token().await else {
            return RenewOutcome::NoRefreshToken;
        };

        let result = self.inner.credentials.refresh(&refresh).await;
        if self.epoch() != epoch {
            debug!("discarding renewal that finished after the session was reset");
            return RenewOutcome::Stale;
        }

        match result {
            Ok(response) if response.success => {
                self.apply_renewal(response, refresh, epoch).await
            }
            Ok(response) => {
                let message = response.message_or("");
                if response.password_expired {
                    self.force_logout(LogoutReason::PasswordExpired).await;
                    RenewOutcome::LoggedOut(LogoutReason::PasswordExpired)
                } else if signals_refresh_invalid(&message) {
                    self.force_logout(LogoutReason::SessionExpired).await;
                    RenewOutcome::LoggedOut(LogoutReason::SessionExpired)
                } else {
                    warn!(%message, "renewal refused, keeping session");
                    RenewOutcome::Deferred
                }
            }
            Err(e) if e.is_connectivity() => {
                warn!(error = %e, "renewal could not reach the server");
                RenewOutcome::Deferred
            }
            Err(e) => {
                error!(error = %e, "renewal failed unexpectedly");
                self.force_logout(LogoutReason::Critical).await;
                RenewOutcome::LoggedOut(LogoutReason::Critical)
            }
        }
    }

    async fn apply_renewal(
        &self,
        response: CredentialResponse,
        previous_refresh: String,
        epoch: u64,
    ) -> RenewOutcome {
        let Some(IssuedTokens {
            access_token,
            refresh_token,
        }) = response.tokens
        else {
            warn!("renewal answered without an access token");
            return RenewOutcome::InvalidToken;
        };

        let pair = match TokenPair::new(&access_token, refresh_token.unwrap_or(previous_refresh)) {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "renewed token failed validation");
                return RenewOutcome::InvalidToken;
            }
        };

        let Some(user) = self.resolve_user(response.user, pair.access(), None) else {
            warn!("renewed access token carries no identity");
            return RenewOutcome::InvalidToken;
        };

        if !self.store_pair(user, pair, epoch).await {
            debug!("discarding renewal that finished after the session was reset");
            return RenewOutcome::Stale;
        }
        debug!(token = %token::preview(&access_token), "access token renewed");
        RenewOutcome::Renewed
    }

    /// Validate and store tokens from a token-producing answer.
    async fn adopt_issued(
        &self,
        response: CredentialResponse,
        email: Option<&str>,
    ) -> Result<(), AuthError> {
        let epoch = self.epoch();
        let Some(IssuedTokens {
            access_token,
            refresh_token,
        }) = response.tokens
        else {
            return Err(self.fail(AuthError::TokenFormatInvalid(
                "no tokens in response".to_string(),
            )));
        };

        let pair = TokenPair::new(&access_token, refresh_token.unwrap_or_default())
            .map_err(|e| self.fail(AuthError::TokenFormatInvalid(e.to_string())))?;

        let user = self
            .resolve_user(response.user, pair.access(), email)
            .ok_or_else(|| {
                self.fail(AuthError::TokenFormatInvalid(
                    "access token carries no identity".to_string(),
                ))
            })?;

        self.store_pair(user, pair, epoch).await;
        Ok(())
    }

    /// Memory first, then cookies. Readers never see half a pair.
    ///
    /// Nothing is stored once the session was reset after `epoch`; returns
    /// false in that case. The cookie write re-checks under the persistence
    /// lock, so a concurrent clear always wins.
    async fn store_pair(&self, user: User, pair: TokenPair, epoch: u64) -> bool {
        let stored = self.inner.state.send_if_modified(|s| {
            if self.epoch() != epoch {
                return false;
            }
            s.authenticate(user, pair.clone());
            true
        });
        if !stored {
            return false;
        }
        match self
            .inner
            .persistence
            .write_if(&pair, || self.epoch() == epoch)
            .await
        {
            Ok(written) => written,
            Err(e) => {
                warn!(error = %e, "could not persist tokens, keeping them in memory only");
                true
            }
        }
    }

    /// Tokens from memory, or from cookies loaded into memory.
    async fn load_tokens(&self) -> Option<TokenPair> {
        let in_memory = self.inner.state.borrow().tokens().cloned();
        if in_memory.is_some() {
            return in_memory;
        }

        let persisted = self.inner.persistence.read().await;
        let pair = TokenPair::new(persisted.access?, persisted.refresh?).ok()?;
        self.update(|s| s.restore_tokens(pair.clone()));
        Some(pair)
    }

    fn resolve_user(
        &self,
        reported: Option<User>,
        access: &Token,
        fallback_email: Option<&str>,
    ) -> Option<User> {
        reported
            .or_else(|| self.inner.state.borrow().user().cloned())
            .or_else(|| access.claims().and_then(User::from_claims))
            .or_else(|| fallback_email.map(User::with_email))
    }

    async fn reset_local(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.update(Session::reset);
        self.inner.pending.clear();
        if let Err(e) = self.inner.persistence.clear().await {
            warn!(error = %e, "could not clear token cookies");
        }
    }

    async fn call<F>(&self, call: F) -> Result<CredentialResponse, AuthError>
    where
        F: std::future::Future<Output = crate::ports::RemoteResult<CredentialResponse>>,
    {
        call.await.map_err(|e| self.fail(AuthError::from(e)))
    }

    fn fail(&self, error: AuthError) -> AuthError {
        let message = error.to_string();
        self.update(|s| s.fail(message));
        error
    }

    fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    fn update(&self, change: impl FnOnce(&mut Session)) {
        self.inner.state.send_modify(change);
    }

    fn loading(&self) -> LoadingGuard<'_> {
        LoadingGuard::enter(&self.inner.state)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("phase", &self.inner.state.borrow().phase())
            .finish_non_exhaustive()
    }
}

/// Typed error for a refused call that was made with the refresh token.
fn refusal(response: &CredentialResponse, fallback: &str) -> AuthError {
    let message = response.message_or(fallback);
    if response.password_expired {
        AuthError::PasswordExpired
    } else if signals_refresh_invalid(&message) {
        AuthError::RefreshExpiredOrInvalid(message)
    } else {
        AuthError::CredentialRejected(message)
    }
}

/// Returns true if a refusal message says the refresh token itself is dead.
fn signals_refresh_invalid(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("token")
        && ["expired", "invalid", "revoked", "not found"]
            .iter()
            .any(|needle| message.contains(needle))
}
