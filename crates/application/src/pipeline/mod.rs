//! Outgoing request pipeline.
//!
//! A [`RequestPipeline`] sends [`ApiRequest`]s through an [`HttpClient`]
//! and an ordered list of [`RequestStage`]s. Every stage sees the request
//! before it is sent and the response after, in list order. A stage may
//! rewrite the request, pass the response on, fail, or ask for the request
//! to be sent once more.
//!
//! # Example
//!
//! ```ignore
//! let pipeline = RequestPipeline::authenticated(client, session.clone());
//! let response = pipeline.send(ApiRequest::get(url)).await?;
//! ```

mod bearer;
mod recovery;
mod trace;

use std::sync::Arc;

use async_trait::async_trait;
use tessera_domain::{ApiRequest, ApiResponse, LogoutReason};
use thiserror::Error;

use crate::auth::SessionStore;
use crate::ports::{HttpClient, RemoteError};

pub use bearer::BearerStage;
pub use recovery::AuthRecoveryStage;
pub use trace::TracingStage;

/// Why a pipeline call produced no usable response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// The request could not be sent.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The server refused the request and no renewal could help.
    #[error("request not authorized")]
    Unauthorized,

    /// Renewal failed and the session was ended.
    #[error("session ended ({0:?})")]
    SessionEnded(LogoutReason),

    /// A stage asked to replay a request that was already replayed.
    #[error("request was already replayed once")]
    ReplayExhausted,
}

/// What a stage wants done with a response.
#[derive(Debug)]
pub enum ResponseAction {
    /// Hand the response to the next stage.
    Continue(ApiResponse),
    /// Drop the response and send this request instead.
    Replay(ApiRequest),
}

/// One request/response transformer.
#[async_trait]
pub trait RequestStage: Send + Sync {
    /// Stage name, for logs.
    fn name(&self) -> &'static str;

    /// Adjust the request before it is sent.
    async fn on_request(&self, _request: &mut ApiRequest) -> Result<(), PipelineError> {
        Ok(())
    }

    /// Inspect the response of `request`.
    async fn on_response(
        &self,
        _request: &ApiRequest,
        response: ApiResponse,
    ) -> Result<ResponseAction, PipelineError> {
        Ok(ResponseAction::Continue(response))
    }
}

/// Ordered stages in front of an HTTP client.
#[derive(Clone)]
pub struct RequestPipeline {
    client: Arc<dyn HttpClient>,
    stages: Vec<Arc<dyn RequestStage>>,
}

impl RequestPipeline {
    /// A pipeline with no stages.
    #[must_use]
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self {
            client,
            stages: Vec::new(),
        }
    }

    /// The standard stack for calls made on behalf of the session:
    /// tracing, bearer injection, then reactive renewal.
    #[must_use]
    pub fn authenticated(client: Arc<dyn HttpClient>, session: SessionStore) -> Self {
        Self::new(client)
            .with_stage(TracingStage)
            .with_stage(BearerStage::new(session.clone()))
            .with_stage(AuthRecoveryStage::new(session))
    }

    /// Append a stage.
    #[must_use]
    pub fn with_stage(mut self, stage: impl RequestStage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Names of the stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Send `request` through every stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if sending fails, a stage fails, or a
    /// stage asks to replay a request a second time.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, PipelineError> {
        loop {
            for stage in &self.stages {
                stage.on_request(&mut request).await?;
            }

            let response = self.client.send(&request).await?;
            match self.respond(&request, response).await? {
                ResponseAction::Continue(response) => return Ok(response),
                ResponseAction::Replay(_) if request.is_replay() => {
                    return Err(PipelineError::ReplayExhausted);
                }
                ResponseAction::Replay(next) => request = next.into_replay(),
            }
        }
    }

    async fn respond(
        &self,
        request: &ApiRequest,
        mut response: ApiResponse,
    ) -> Result<ResponseAction, PipelineError> {
        for stage in &self.stages {
            match stage.on_response(request, response).await? {
                ResponseAction::Continue(next) => response = next,
                replay @ ResponseAction::Replay(_) => {
                    tracing::debug!(stage = stage.name(), request = %request.id, "replay requested");
                    return Ok(replay);
                }
            }
        }
        Ok(ResponseAction::Continue(response))
    }
}

impl std::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}
