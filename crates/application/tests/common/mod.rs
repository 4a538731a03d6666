//! Shared fakes for the integration tests.
//!
//! [`AuthServer`] behaves like a small identity service: it checks the
//! password and one-time code, issues JWT-shaped tokens, rotates the refresh
//! token on every renewal and revokes it on logout. [`ResourceServer`]
//! accepts a request only if it carries the access token issued last.
#![allow(dead_code, missing_docs, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::json;
use tessera_application::ports::{
    Clock, CookieStore, CredentialResponse, CredentialService, HttpClient, Navigator,
    RemoteError, RemoteResult, SessionStorage, StorageError,
};
use tessera_application::{PendingAuthStore, SessionConfig, SessionStore, TokenPersistence};
use tessera_domain::{ApiRequest, ApiResponse, Cookie, LogoutReason, Session};

pub const EMAIL: &str = "a@x.com";
pub const PASSWORD: &str = "secret";
pub const CODE: &str = "123456";

static SERIAL: AtomicU32 = AtomicU32::new(0);

/// A signed-looking JWT for `EMAIL`, unique per call.
pub fn issue_jwt(kind: &str, lifetime: chrono::Duration) -> String {
    let serial = SERIAL.fetch_add(1, Ordering::Relaxed);
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD.encode(
        json!({
            "sub": "u-1",
            "email": EMAIL,
            "name": "Ada",
            "role": "admin",
            "typ": kind,
            "jti": serial,
            "exp": (Utc::now() + lifetime).timestamp(),
        })
        .to_string(),
    );
    format!("{header}.{claims}.sig{serial}")
}

#[derive(Default)]
struct Issued {
    access: Option<String>,
    refresh: Option<String>,
}

/// Identity service double.
#[derive(Default)]
pub struct AuthServer {
    issued: Mutex<Issued>,
    calls: Mutex<Vec<&'static str>>,
    /// Issue `not-a-jwt` instead of real tokens.
    pub malformed_tokens: Mutex<bool>,
    /// Require a password change after the second factor.
    pub require_password_change: Mutex<bool>,
    /// Answer every call with a connectivity error.
    pub offline: Mutex<bool>,
}

impl AuthServer {
    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().iter().filter(|c| **c == operation).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn current_access(&self) -> Option<String> {
        self.issued.lock().access.clone()
    }

    /// Invalidate the access token, as its expiry would.
    pub fn expire_access(&self) {
        self.issued.lock().access = None;
    }

    /// Revoke the refresh token, as a logout on another device would.
    pub fn revoke_refresh(&self) {
        self.issued.lock().refresh = None;
    }

    fn record(&self, operation: &'static str) -> RemoteResult<()> {
        self.calls.lock().push(operation);
        if *self.offline.lock() {
            return Err(RemoteError::Connectivity("connection refused".to_string()));
        }
        Ok(())
    }

    fn issue(&self) -> CredentialResponse {
        if *self.malformed_tokens.lock() {
            return CredentialResponse::ok()
                .with_tokens("not-a-jwt", Some("not-a-jwt".to_string()));
        }
        let access = issue_jwt("access", chrono::Duration::minutes(15));
        let refresh = issue_jwt("refresh", chrono::Duration::days(7));
        let mut issued = self.issued.lock();
        issued.access = Some(access.clone());
        issued.refresh = Some(refresh.clone());
        CredentialResponse::ok().with_tokens(access, Some(refresh))
    }

    fn holds_refresh(&self, token: &str) -> bool {
        self.issued.lock().refresh.as_deref() == Some(token)
    }
}

#[async_trait]
impl CredentialService for AuthServer {
    async fn login(&self, email: &str, password: &str) -> RemoteResult<CredentialResponse> {
        self.record("login")?;
        if email == EMAIL && password == PASSWORD {
            Ok(CredentialResponse::ok())
        } else {
            Ok(CredentialResponse::rejected("Invalid email or password"))
        }
    }

    async fn confirm_second_factor(
        &self,
        _email: &str,
        code: &str,
    ) -> RemoteResult<CredentialResponse> {
        self.record("confirm_second_factor")?;
        if code != CODE {
            return Ok(CredentialResponse::rejected("Invalid verification code"));
        }
        if *self.require_password_change.lock() {
            let mut response = CredentialResponse::rejected("Password change required");
            response.must_change_password = true;
            response.change_ticket = Some("ticket-1".to_string());
            return Ok(response);
        }
        Ok(self.issue())
    }

    async fn change_password(
        &self,
        _email: &str,
        _new_password: &str,
        ticket: Option<&str>,
    ) -> RemoteResult<CredentialResponse> {
        self.record("change_password")?;
        if ticket != Some("ticket-1") {
            return Ok(CredentialResponse::rejected("Missing change ticket"));
        }
        *self.require_password_change.lock() = false;
        Ok(self.issue())
    }

    async fn forgot_password(&self, _email: &str) -> RemoteResult<CredentialResponse> {
        self.record("forgot_password")?;
        Ok(CredentialResponse::ok())
    }

    async fn refresh(&self, refresh_token: &str) -> RemoteResult<CredentialResponse> {
        self.record("refresh")?;
        if self.holds_refresh(refresh_token) {
            Ok(self.issue())
        } else {
            Ok(CredentialResponse::rejected("Refresh token expired"))
        }
    }

    async fn logout(&self, refresh_token: &str) -> RemoteResult<CredentialResponse> {
        self.record("logout")?;
        if self.holds_refresh(refresh_token) {
            *self.issued.lock() = Issued::default();
        }
        Ok(CredentialResponse::ok())
    }

    async fn logout_all(&self, _refresh_token: &str) -> RemoteResult<CredentialResponse> {
        self.record("logout_all")?;
        *self.issued.lock() = Issued::default();
        Ok(CredentialResponse::ok())
    }

    async fn verify_access(&self, access_token: &str) -> RemoteResult<CredentialResponse> {
        self.record("verify_access")?;
        if self.issued.lock().access.as_deref() == Some(access_token) {
            Ok(CredentialResponse::ok())
        } else {
            Ok(CredentialResponse::rejected("Invalid token"))
        }
    }
}

/// Application API double guarded by the auth server's access token.
pub struct ResourceServer {
    auth: Arc<AuthServer>,
    received: Mutex<Vec<ApiRequest>>,
}

impl ResourceServer {
    pub fn new(auth: Arc<AuthServer>) -> Self {
        Self {
            auth,
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn received(&self) -> Vec<ApiRequest> {
        self.received.lock().clone()
    }
}

#[async_trait]
impl HttpClient for ResourceServer {
    async fn send(&self, request: &ApiRequest) -> RemoteResult<ApiResponse> {
        self.received.lock().push(request.clone());
        let expected = self.auth.current_access().map(|t| format!("Bearer {t}"));
        let presented = request
            .header(tessera_domain::request::AUTHORIZATION)
            .map(str::to_string);
        if expected.is_some() && presented == expected {
            Ok(ApiResponse::json(200, &json!({ "items": [] })))
        } else {
            Ok(ApiResponse::json(401, &json!({ "message": "Unauthorized" })))
        }
    }
}

/// Cookie store that remembers what was written.
#[derive(Default)]
pub struct CookieJar {
    cookies: Mutex<HashMap<String, Cookie>>,
    pub writes: Mutex<Vec<String>>,
}

impl CookieJar {
    pub fn value(&self, name: &str) -> Option<String> {
        self.cookies.lock().get(name).map(|c| c.value.clone())
    }

    pub fn remove(&self, name: &str) {
        self.cookies.lock().remove(name);
    }
}

#[async_trait]
impl CookieStore for CookieJar {
    async fn get(&self, name: &str) -> Option<String> {
        self.value(name)
    }

    async fn set(&self, cookie: Cookie) -> Result<(), StorageError> {
        self.writes.lock().push(cookie.name.clone());
        let mut cookies = self.cookies.lock();
        if cookie.is_deletion() {
            cookies.remove(&cookie.name);
        } else {
            cookies.insert(cookie.name.clone(), cookie);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct TabStorage(Mutex<HashMap<String, String>>);

impl SessionStorage for TabStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.0.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.0.lock().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.0.lock().remove(key);
    }
}

#[derive(Default)]
pub struct Redirects(Mutex<Vec<LogoutReason>>);

impl Redirects {
    pub fn all(&self) -> Vec<LogoutReason> {
        self.0.lock().clone()
    }
}

impl Navigator for Redirects {
    fn redirect_to_login(&self, reason: LogoutReason) {
        self.0.lock().push(reason);
    }
}

pub struct WallClock;

impl Clock for WallClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A client session wired against the server doubles.
pub struct World {
    pub auth: Arc<AuthServer>,
    pub api: Arc<ResourceServer>,
    pub cookies: Arc<CookieJar>,
    pub storage: Arc<TabStorage>,
    pub redirects: Arc<Redirects>,
    pub persistence: TokenPersistence,
    pub pending: PendingAuthStore,
    pub session: SessionStore,
}

impl World {
    pub fn new() -> Self {
        let auth = Arc::new(AuthServer::default());
        Self::connect(auth, Arc::new(CookieJar::default()))
    }

    /// A fresh client process sharing the server and the durable cookies.
    pub fn restart(&self) -> Self {
        Self::connect(self.auth.clone(), self.cookies.clone())
    }

    fn connect(auth: Arc<AuthServer>, cookies: Arc<CookieJar>) -> Self {
        let config = SessionConfig::default();
        let clock: Arc<dyn Clock> = Arc::new(WallClock);
        let storage = Arc::new(TabStorage::default());
        let redirects = Arc::new(Redirects::default());
        let persistence = TokenPersistence::new(cookies.clone(), clock.clone(), &config);
        let pending = PendingAuthStore::new(storage.clone());
        let session = SessionStore::new(
            auth.clone(),
            persistence.clone(),
            pending.clone(),
            redirects.clone(),
            clock,
            config,
        );
        Self {
            api: Arc::new(ResourceServer::new(auth.clone())),
            auth,
            cookies,
            storage,
            redirects,
            persistence,
            pending,
            session,
        }
    }

    /// Complete both login steps.
    pub async fn sign_in(&self) {
        self.session.login(EMAIL, PASSWORD).await.unwrap();
        self.session
            .confirm_second_factor(EMAIL, CODE)
            .await
            .unwrap();
        assert_consistent(&self.session.snapshot());
    }
}

/// An authenticated session always has a user and an access token.
pub fn assert_consistent(session: &Session) {
    if session.is_authenticated() {
        assert!(session.user().is_some(), "authenticated without a user");
        assert!(
            session.access_token().is_some(),
            "authenticated without an access token"
        );
    }
}
