use async_trait::async_trait;
use tessera_domain::{ApiRequest, ApiResponse};

use super::{PipelineError, RequestStage, ResponseAction};

/// Debug log of every request and response. Never logs headers or bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStage;

#[async_trait]
impl RequestStage for TracingStage {
    fn name(&self) -> &'static str {
        "tracing"
    }

    async fn on_request(&self, request: &mut ApiRequest) -> Result<(), PipelineError> {
        tracing::debug!(
            request = %request.id,
            method = %request.method,
            url = %request.url,
            replay = request.is_replay(),
            "sending request"
        );
        Ok(())
    }

    async fn on_response(
        &self,
        request: &ApiRequest,
        response: ApiResponse,
    ) -> Result<ResponseAction, PipelineError> {
        tracing::debug!(request = %request.id, status = response.status, "response received");
        Ok(ResponseAction::Continue(response))
    }
}
