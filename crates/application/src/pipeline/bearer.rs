use async_trait::async_trait;
use tessera_domain::ApiRequest;
use tessera_domain::request::AUTHORIZATION;

use super::{PipelineError, RequestStage};
use crate::auth::SessionStore;

/// Attaches the session's access token as a bearer header.
///
/// Requests made without a session go out untouched.
#[derive(Debug, Clone)]
pub struct BearerStage {
    session: SessionStore,
}

impl BearerStage {
    /// Create the stage.
    #[must_use]
    pub const fn new(session: SessionStore) -> Self {
        Self { session }
    }
}

#[async_trait]
impl RequestStage for BearerStage {
    fn name(&self) -> &'static str {
        "bearer"
    }

    async fn on_request(&self, request: &mut ApiRequest) -> Result<(), PipelineError> {
        if let Some(header) = self.session.bearer_header() {
            request.set_header(AUTHORIZATION, header);
        }
        Ok(())
    }
}
