//! In-crate fakes for unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, missing_docs)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tessera_domain::{
    ApiRequest, ApiResponse, Cookie, Employee, LogoutReason, NewEmployee, NewUserAccount, User,
    UserAccount,
};
use tokio::sync::broadcast;

use crate::auth::{PendingAuthStore, SessionStore, TokenPersistence};
use crate::config::SessionConfig;
use crate::ports::{
    Clock, CookieStore, CredentialResponse, CredentialService, CurrentUserCache, HttpClient,
    Navigator, ProvisioningError, ProvisioningService, RemoteError, RemoteResult, SessionStorage,
    StorageError, UserCacheEvent,
};

pub fn jwt(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.sig")
}

/// Access token for user `u-1` expiring in `minutes`.
pub fn access_token(minutes: i64) -> String {
    jwt(&serde_json::json!({
        "sub": "u-1",
        "email": "a@x.com",
        "name": "Ada",
        "role": "admin",
        "exp": (Utc::now() + chrono::Duration::minutes(minutes)).timestamp(),
    }))
}

pub fn refresh_token() -> String {
    jwt(&serde_json::json!({
        "sub": "u-1",
        "exp": (Utc::now() + chrono::Duration::days(7)).timestamp(),
    }))
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Default)]
pub struct MemoryCookies {
    cookies: Mutex<HashMap<String, Cookie>>,
    pub writes: Mutex<Vec<String>>,
    /// Delay every non-deleting write of the named cookie.
    pub slow_writes: Mutex<Option<(&'static str, Duration)>>,
}

impl MemoryCookies {
    pub fn cookie(&self, name: &str) -> Option<Cookie> {
        self.cookies.lock().get(name).cloned()
    }
}

#[async_trait]
impl CookieStore for MemoryCookies {
    async fn get(&self, name: &str) -> Option<String> {
        self.cookies.lock().get(name).map(|c| c.value.clone())
    }

    async fn set(&self, cookie: Cookie) -> Result<(), StorageError> {
        let delay = *self.slow_writes.lock();
        if let Some((name, delay)) = delay
            && name == cookie.name
            && !cookie.is_deletion()
        {
            tokio::time::sleep(delay).await;
        }
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
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.lock().remove(key);
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub redirects: Mutex<Vec<LogoutReason>>,
}

impl Navigator for RecordingNavigator {
    fn redirect_to_login(&self, reason: LogoutReason) {
        self.redirects.lock().push(reason);
    }
}

/// Credential service answering from per-operation scripts.
#[derive(Default)]
pub struct ScriptedCredentials {
    scripts: Mutex<HashMap<&'static str, VecDeque<RemoteResult<CredentialResponse>>>>,
    calls: Mutex<Vec<&'static str>>,
    pub delay: Mutex<Option<Duration>>,
}

impl ScriptedCredentials {
    pub fn push(&self, op: &'static str, answer: RemoteResult<CredentialResponse>) {
        self.scripts.lock().entry(op).or_default().push_back(answer);
    }

    pub fn calls(&self, op: &str) -> usize {
        self.calls.lock().iter().filter(|c| **c == op).count()
    }

    async fn answer(&self, op: &'static str) -> RemoteResult<CredentialResponse> {
        self.calls.lock().push(op);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.scripts
            .lock()
            .get_mut(op)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(RemoteError::Other(format!("unscripted call: {op}"))))
    }
}

#[async_trait]
impl CredentialService for ScriptedCredentials {
    async fn login(&self, _email: &str, _password: &str) -> RemoteResult<CredentialResponse> {
        self.answer("login").await
    }

    async fn confirm_second_factor(
        &self,
        _email: &str,
        _code: &str,
    ) -> RemoteResult<CredentialResponse> {
        self.answer("confirm_second_factor").await
    }

    async fn change_password(
        &self,
        _email: &str,
        _new_password: &str,
        _ticket: Option<&str>,
    ) -> RemoteResult<CredentialResponse> {
        self.answer("change_password").await
    }

    async fn forgot_password(&self, _email: &str) -> RemoteResult<CredentialResponse> {
        self.answer("forgot_password").await
    }

    async fn refresh(&self, _refresh_token: &str) -> RemoteResult<CredentialResponse> {
        self.answer("refresh").await
    }

    async fn logout(&self, _refresh_token: &str) -> RemoteResult<CredentialResponse> {
        self.answer("logout").await
    }

    async fn logout_all(&self, _refresh_token: &str) -> RemoteResult<CredentialResponse> {
        self.answer("logout_all").await
    }

    async fn verify_access(&self, _access_token: &str) -> RemoteResult<CredentialResponse> {
        self.answer("verify_access").await
    }
}

pub struct TestUserCache {
    user: Mutex<Option<User>>,
    events: broadcast::Sender<UserCacheEvent>,
}

impl Default for TestUserCache {
    fn default() -> Self {
        Self {
            user: Mutex::new(None),
            events: broadcast::channel(8).0,
        }
    }
}

impl TestUserCache {
    pub fn store(&self, user: Option<User>) {
        let event = if user.is_some() {
            UserCacheEvent::Updated
        } else {
            UserCacheEvent::Invalidated
        };
        *self.user.lock() = user;
        let _ = self.events.send(event);
    }
}

impl CurrentUserCache for TestUserCache {
    fn current(&self) -> Option<User> {
        self.user.lock().clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<UserCacheEvent> {
        self.events.subscribe()
    }
}

/// A session store wired to fakes.
pub struct Harness {
    pub session: SessionStore,
    pub credentials: Arc<ScriptedCredentials>,
    pub cookies: Arc<MemoryCookies>,
    pub storage: Arc<MemoryStorage>,
    pub navigator: Arc<RecordingNavigator>,
    pub persistence: TokenPersistence,
    pub pending: PendingAuthStore,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        let credentials = Arc::new(ScriptedCredentials::default());
        let cookies = Arc::new(MemoryCookies::default());
        let storage = Arc::new(MemoryStorage::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let clock: Arc<dyn Clock> = Arc::new(SystemTime);
        let persistence = TokenPersistence::new(cookies.clone(), clock.clone(), &config);
        let pending = PendingAuthStore::new(storage.clone());
        let session = SessionStore::new(
            credentials.clone(),
            persistence.clone(),
            pending.clone(),
            navigator.clone(),
            clock,
            config,
        );
        Self {
            session,
            credentials,
            cookies,
            storage,
            navigator,
            persistence,
            pending,
        }
    }

    pub fn redirects(&self) -> Vec<LogoutReason> {
        self.navigator.redirects.lock().clone()
    }

    /// Put the session into the authenticated state through the public API.
    pub async fn sign_in(&self) {
        self.credentials.push(
            "confirm_second_factor",
            Ok(CredentialResponse::ok().with_tokens(access_token(15), Some(refresh_token()))),
        );
        self.session
            .confirm_second_factor("a@x.com", "123456")
            .await
            .unwrap();
    }
}

pub struct SystemTime;

impl Clock for SystemTime {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// HTTP client answering from a queue and recording what it sent.
#[derive(Default)]
pub struct ScriptedHttp {
    responses: Mutex<VecDeque<RemoteResult<ApiResponse>>>,
    sent: Mutex<Vec<ApiRequest>>,
}

impl ScriptedHttp {
    pub fn push(&self, response: RemoteResult<ApiResponse>) {
        self.responses.lock().push_back(response);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn send(&self, request: &ApiRequest) -> RemoteResult<ApiResponse> {
        self.sent.lock().push(request.clone());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(RemoteError::Other("unscripted request".to_string())))
    }
}

/// Provisioning service with scripted failures and call counters.
#[derive(Default)]
pub struct FakeProvisioning {
    pub create_failures: Mutex<VecDeque<ProvisioningError>>,
    pub register_error: Mutex<Option<ProvisioningError>>,
    pub delete_error: Mutex<Option<ProvisioningError>>,
    pub existing: Mutex<Option<UserAccount>>,
    pub created: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    pub create_attempts: Mutex<usize>,
    pub registered: Mutex<Vec<NewUserAccount>>,
}

#[async_trait]
impl ProvisioningService for FakeProvisioning {
    async fn create_employee(&self, employee: &NewEmployee) -> Result<Employee, ProvisioningError> {
        *self.create_attempts.lock() += 1;
        if let Some(error) = self.create_failures.lock().pop_front() {
            return Err(error);
        }
        let id = format!("emp-{}", employee.national_id);
        self.created.lock().push(id.clone());
        Ok(Employee {
            id,
            national_id: employee.national_id.clone(),
            full_name: employee.full_name.clone(),
            email: employee.email.clone(),
        })
    }

    async fn delete_employee(&self, employee_id: &str) -> Result<(), ProvisioningError> {
        self.deleted.lock().push(employee_id.to_string());
        self.delete_error.lock().clone().map_or(Ok(()), Err)
    }

    async fn register_user(
        &self,
        account: &NewUserAccount,
    ) -> Result<UserAccount, ProvisioningError> {
        self.registered.lock().push(account.clone());
        if let Some(error) = self.register_error.lock().clone() {
            return Err(error);
        }
        Ok(UserAccount {
            id: "acc-1".to_string(),
            email: account.email.clone(),
            national_id: account.national_id.clone(),
        })
    }

    async fn find_user_by_national_id(
        &self,
        _national_id: &str,
    ) -> Result<Option<UserAccount>, ProvisioningError> {
        Ok(self.existing.lock().clone())
    }
}
