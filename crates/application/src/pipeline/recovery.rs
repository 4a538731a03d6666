//! Reactive renewal on auth failures.

use async_trait::async_trait;
use tessera_domain::request::AUTHORIZATION;
use tessera_domain::{ApiRequest, ApiResponse, LogoutReason};
use tracing::{debug, warn};

use super::{PipelineError, RequestStage, ResponseAction};
use crate::auth::{RenewOutcome, SessionStore};

/// Renews the access token on a 401 and replays the request once.
///
/// Without a refresh token the 401 is final: the request may have been
/// sent before login. Any renewal failure ends the session.
#[derive(Debug, Clone)]
pub struct AuthRecoveryStage {
    session: SessionStore,
}

impl AuthRecoveryStage {
    /// Create the stage.
    #[must_use]
    pub const fn new(session: SessionStore) -> Self {
        Self { session }
    }
}

#[async_trait]
impl RequestStage for AuthRecoveryStage {
    fn name(&self) -> &'static str {
        "auth-recovery"
    }

    async fn on_response(
        &self,
        request: &ApiRequest,
        response: ApiResponse,
    ) -> Result<ResponseAction, PipelineError> {
        if !response.is_auth_failure() {
            return Ok(ResponseAction::Continue(response));
        }
        if request.is_replay() {
            warn!(request = %request.id, url = %request.url, "replayed request still unauthorized");
            return Err(PipelineError::Unauthorized);
        }
        if self.session.refresh_token().await.is_none() {
            debug!(url = %request.url, "unauthorized without a refresh token");
            return Err(PipelineError::Unauthorized);
        }

        match self.session.renew_token().await {
            RenewOutcome::Renewed => {
                let Some(header) = self.session.bearer_header() else {
                    return Err(PipelineError::Unauthorized);
                };
                let mut replay = request.clone();
                replay.set_header(AUTHORIZATION, header);
                Ok(ResponseAction::Replay(replay))
            }
            RenewOutcome::NoRefreshToken | RenewOutcome::Stale => Err(PipelineError::Unauthorized),
            RenewOutcome::LoggedOut(reason) => Err(PipelineError::SessionEnded(reason)),
            RenewOutcome::InvalidToken => Err(self.end_session(LogoutReason::InvalidToken).await),
            RenewOutcome::Deferred => Err(self.end_session(LogoutReason::SessionExpired).await),
        }
    }
}

impl AuthRecoveryStage {
    async fn end_session(&self, reason: LogoutReason) -> PipelineError {
        self.session.force_logout(reason).await;
        PipelineError::SessionEnded(reason)
    }
}
