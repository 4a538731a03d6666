//! HTTP Client port

use async_trait::async_trait;
use tessera_domain::{ApiRequest, ApiResponse};

use super::RemoteResult;

/// Port for executing API requests.
///
/// Any HTTP status is a successful call at this level; only transport
/// failures are errors.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Executes a request and returns the response.
    async fn send(&self, request: &ApiRequest) -> RemoteResult<ApiResponse>;
}
