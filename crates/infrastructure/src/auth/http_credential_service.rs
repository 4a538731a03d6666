//! Credential service over HTTP.
//!
//! Every endpoint answers with the same JSON envelope. Refusals (wrong
//! password, expired refresh token) come back as non-2xx statuses with a
//! readable envelope and are reported as `success: false`, not as errors.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tessera_application::ports::{
    CredentialResponse, CredentialService, IssuedTokens, RemoteError, RemoteResult,
};
use tessera_domain::User;

use crate::adapters::ReqwestHttpClient;

/// Answer envelope shared by all credential endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Envelope {
    success: Option<bool>,
    message: Option<String>,
    error: Option<String>,
    #[serde(alias = "token")]
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<User>,
    must_change_password: bool,
    password_expired: bool,
    #[serde(alias = "changePasswordTicket")]
    change_ticket: Option<String>,
}

impl Envelope {
    fn into_response(self, http_ok: bool) -> CredentialResponse {
        let tokens = self.access_token.map(|access_token| IssuedTokens {
            access_token,
            refresh_token: self.refresh_token,
        });
        CredentialResponse {
            success: http_ok && self.success.unwrap_or(true),
            message: self.message.or(self.error),
            tokens,
            user: self.user,
            must_change_password: self.must_change_password,
            password_expired: self.password_expired,
            change_ticket: self.change_ticket,
        }
    }
}

/// Map an HTTP answer onto a [`CredentialResponse`].
///
/// 2xx and 4xx answers become responses; a 4xx without a readable envelope
/// is a refusal carrying the raw body. 5xx answers without an envelope are
/// transport-level errors.
fn interpret(status: u16, body: &[u8]) -> RemoteResult<CredentialResponse> {
    let http_ok = (200..300).contains(&status);
    let envelope = if body.iter().all(u8::is_ascii_whitespace) {
        Ok(Envelope::default())
    } else {
        serde_json::from_slice::<Envelope>(body)
    };

    match envelope {
        Ok(envelope) => Ok(envelope.into_response(http_ok)),
        Err(e) if http_ok => Err(RemoteError::Decode(e.to_string())),
        Err(_) if status < 500 => Ok(CredentialResponse::rejected(
            String::from_utf8_lossy(body).trim().to_string(),
        )),
        Err(_) => Err(RemoteError::Status {
            status,
            message: String::from_utf8_lossy(body).trim().to_string(),
        }),
    }
}

/// [`CredentialService`] talking to the authentication API.
#[derive(Debug, Clone)]
pub struct HttpCredentialService {
    client: Client,
    base_url: String,
}

impl HttpCredentialService {
    /// Create the service for the API at `base_url`.
    #[must_use]
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/{path}", self.base_url)
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> RemoteResult<CredentialResponse> {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(&body)
            .send()
            .await
            .map_err(|e| ReqwestHttpClient::map_error(&e))?;
        Self::read(response).await
    }

    async fn read(response: reqwest::Response) -> RemoteResult<CredentialResponse> {
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| RemoteError::Decode(format!("failed to read body: {e}")))?;
        interpret(status, &body)
    }
}

#[async_trait]
impl CredentialService for HttpCredentialService {
    async fn login(&self, email: &str, password: &str) -> RemoteResult<CredentialResponse> {
        self.post("login", json!({ "email": email, "password": password }))
            .await
    }

    async fn confirm_second_factor(
        &self,
        email: &str,
        code: &str,
    ) -> RemoteResult<CredentialResponse> {
        self.post("verify-2fa", json!({ "email": email, "code": code }))
            .await
    }

    async fn change_password(
        &self,
        email: &str,
        new_password: &str,
        ticket: Option<&str>,
    ) -> RemoteResult<CredentialResponse> {
        self.post(
            "change-password",
            json!({ "email": email, "newPassword": new_password, "ticket": ticket }),
        )
        .await
    }

    async fn forgot_password(&self, email: &str) -> RemoteResult<CredentialResponse> {
        self.post("forgot-password", json!({ "email": email })).await
    }

    async fn refresh(&self, refresh_token: &str) -> RemoteResult<CredentialResponse> {
        self.post("refresh", json!({ "refreshToken": refresh_token }))
            .await
    }

    async fn logout(&self, refresh_token: &str) -> RemoteResult<CredentialResponse> {
        self.post("logout", json!({ "refreshToken": refresh_token }))
            .await
    }

    async fn logout_all(&self, refresh_token: &str) -> RemoteResult<CredentialResponse> {
        self.post("logout-all", json!({ "refreshToken": refresh_token }))
            .await
    }

    async fn verify_access(&self, access_token: &str) -> RemoteResult<CredentialResponse> {
        let response = self
            .client
            .get(self.endpoint("verify"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ReqwestHttpClient::map_error(&e))?;
        Self::read(response).await
    }
}
