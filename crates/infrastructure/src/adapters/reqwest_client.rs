//! HTTP Client implementation using reqwest.
//!
//! This adapter implements the `HttpClient` port using the reqwest library.
//! Every HTTP status is returned as a response; only transport failures
//! become errors.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use tessera_application::ports::{HttpClient, RemoteError, RemoteResult};
use tessera_domain::{ApiRequest, ApiResponse, HttpMethod};

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("Tessera/", env!("CARGO_PKG_VERSION"));

/// HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Creates a client with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn new(timeout: Duration) -> RemoteResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| RemoteError::Other(e.to_string()))?;

        Ok(Self { client })
    }

    /// Creates a new HTTP client with a custom reqwest client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// The underlying reqwest client, for adapters sharing its connection pool.
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    /// Converts domain `HttpMethod` to reqwest `Method`.
    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    /// Maps reqwest errors to `RemoteError`.
    pub(crate) fn map_error(error: &reqwest::Error) -> RemoteError {
        if error.is_timeout() {
            return RemoteError::Timeout;
        }
        if error.is_connect() || error.is_request() {
            return RemoteError::Connectivity(error.to_string());
        }
        if error.is_decode() || error.is_body() {
            return RemoteError::Decode(error.to_string());
        }
        RemoteError::Other(error.to_string())
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn send(&self, request: &ApiRequest) -> RemoteResult<ApiResponse> {
        let url = Url::parse(&request.url)
            .map_err(|e| RemoteError::Other(format!("invalid URL {}: {e}", request.url)))?;

        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| Self::map_error(&e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("<binary>").to_string()))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| RemoteError::Decode(format!("failed to read body: {e}")))?
            .to_vec();

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
