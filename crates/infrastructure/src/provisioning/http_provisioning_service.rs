//! Provisioning service over the authenticated request pipeline.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tessera_application::pipeline::{PipelineError, RequestPipeline};
use tessera_application::ports::{ProvisioningError, ProvisioningService, RemoteError};
use tessera_domain::{ApiRequest, ApiResponse, Employee, NewEmployee, NewUserAccount, UserAccount};

/// Error body of the provisioning API.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Problem {
    message: Option<String>,
    code: Option<String>,
    already_exists: bool,
    email_already_registered: bool,
}

impl Problem {
    fn parse(response: &ApiResponse) -> Self {
        response.json_body().unwrap_or_default()
    }

    fn into_error(self, response: &ApiResponse) -> ProvisioningError {
        let code = self.code.as_deref().map(str::to_ascii_uppercase);
        if self.email_already_registered || code.as_deref() == Some("EMAIL_ALREADY_REGISTERED") {
            return ProvisioningError::EmailAlreadyRegistered;
        }
        if self.already_exists
            || code.as_deref() == Some("ALREADY_EXISTS")
            || response.status == CONFLICT
        {
            return ProvisioningError::AlreadyExists;
        }
        let message = self
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("status {}", response.status));
        if response.status >= 500 {
            return ProvisioningError::Remote(RemoteError::Status {
                status: response.status,
                message,
            });
        }
        ProvisioningError::Rejected(message)
    }
}

const CONFLICT: u16 = 409;
const NOT_FOUND: u16 = 404;

fn pipeline_error(error: PipelineError) -> ProvisioningError {
    match error {
        PipelineError::Remote(e) => ProvisioningError::Remote(e),
        other => ProvisioningError::Rejected(other.to_string()),
    }
}

fn decode<T: DeserializeOwned>(response: &ApiResponse) -> Result<T, ProvisioningError> {
    response
        .json_body()
        .map_err(|e| ProvisioningError::Remote(RemoteError::Decode(e.to_string())))
}

/// [`ProvisioningService`] for the employee and account API.
///
/// Calls run through the session's request pipeline, so they carry the
/// bearer token and recover from an expired access token.
#[derive(Debug, Clone)]
pub struct HttpProvisioningService {
    pipeline: RequestPipeline,
    base_url: String,
}

impl HttpProvisioningService {
    /// Create the service for the API at `base_url`.
    #[must_use]
    pub fn new(pipeline: RequestPipeline, base_url: &str) -> Self {
        Self {
            pipeline,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ProvisioningError> {
        self.pipeline.send(request).await.map_err(pipeline_error)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ProvisioningError> {
        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(Problem::parse(&response).into_error(&response));
        }
        decode(&response)
    }
}

#[async_trait]
impl ProvisioningService for HttpProvisioningService {
    async fn create_employee(&self, employee: &NewEmployee) -> Result<Employee, ProvisioningError> {
        let body = serde_json::to_value(employee)
            .map_err(|e| ProvisioningError::Rejected(e.to_string()))?;
        self.send_json(ApiRequest::post(self.endpoint("employees"), body))
            .await
    }

    async fn delete_employee(&self, employee_id: &str) -> Result<(), ProvisioningError> {
        let response = self
            .send(ApiRequest::delete(self.endpoint(&format!("employees/{employee_id}"))))
            .await?;
        if response.is_success() {
            Ok(())
        } else {
            Err(Problem::parse(&response).into_error(&response))
        }
    }

    async fn register_user(
        &self,
        account: &NewUserAccount,
    ) -> Result<UserAccount, ProvisioningError> {
        let body = serde_json::to_value(account)
            .map_err(|e| ProvisioningError::Rejected(e.to_string()))?;
        self.send_json(ApiRequest::post(self.endpoint("users/register"), body))
            .await
    }

    async fn find_user_by_national_id(
        &self,
        national_id: &str,
    ) -> Result<Option<UserAccount>, ProvisioningError> {
        let response = self
            .send(ApiRequest::get(
                self.endpoint(&format!("users/by-national-id/{national_id}")),
            ))
            .await?;
        match response.status {
            NOT_FOUND => Ok(None),
            _ if response.is_success() => decode(&response).map(Some),
            _ => Err(Problem::parse(&response).into_error(&response)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use tessera_application::ports::{HttpClient, RemoteResult};
    use tessera_domain::HttpMethod;

    #[derive(Default)]
    struct CannedHttp {
        responses: Mutex<VecDeque<ApiResponse>>,
        sent: Mutex<Vec<ApiRequest>>,
    }

    #[async_trait]
    impl HttpClient for CannedHttp {
        async fn send(&self, request: &ApiRequest) -> RemoteResult<ApiResponse> {
            self.sent.lock().push(request.clone());
            self.responses
                .lock()
                .pop_front()
                .ok_or_else(|| RemoteError::Other("no canned response".to_string()))
        }
    }

    fn service(responses: Vec<ApiResponse>) -> (HttpProvisioningService, Arc<CannedHttp>) {
        let http = Arc::new(CannedHttp {
            responses: Mutex::new(responses.into()),
            sent: Mutex::default(),
        });
        let pipeline = RequestPipeline::new(http.clone());
        (
            HttpProvisioningService::new(pipeline, "https://api.test/"),
            http,
        )
    }

    fn new_account() -> NewUserAccount {
        NewUserAccount {
            email: "ada@x.com".to_string(),
            national_id: "12345678".to_string(),
            role: "employee".to_string(),
            employee_id: Some("emp-1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_employee() {
        let (service, http) = service(vec![ApiResponse::json(
            201,
            &json!({"id": "emp-1", "nationalId": "12345678", "fullName": "Ada", "email": "ada@x.com"}),
        )]);

        let employee = service
            .create_employee(&NewEmployee {
                national_id: "12345678".to_string(),
                full_name: "Ada".to_string(),
                email: "ada@x.com".to_string(),
                position: None,
            })
            .await
            .unwrap();

        assert_eq!(employee.id, "emp-1");
        let sent = http.sent.lock();
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].url, "https://api.test/employees");
        assert_eq!(sent[0].body.as_ref().unwrap()["nationalId"], "12345678");
    }

    #[tokio::test]
    async fn test_register_conflicts() {
        let (service, _) = service(vec![
            ApiResponse::json(409, &json!({"emailAlreadyRegistered": true})),
            ApiResponse::json(409, &json!({"message": "duplicate"})),
            ApiResponse::json(400, &json!({"code": "already_exists"})),
        ]);

        assert_eq!(
            service.register_user(&new_account()).await.unwrap_err(),
            ProvisioningError::EmailAlreadyRegistered
        );
        assert_eq!(
            service.register_user(&new_account()).await.unwrap_err(),
            ProvisioningError::AlreadyExists
        );
        assert_eq!(
            service.register_user(&new_account()).await.unwrap_err(),
            ProvisioningError::AlreadyExists
        );
    }

    #[tokio::test]
    async fn test_other_failures() {
        let (service, _) = service(vec![
            ApiResponse::json(422, &json!({"message": "invalid role"})),
            ApiResponse::new(500),
        ]);

        assert_eq!(
            service.register_user(&new_account()).await.unwrap_err(),
            ProvisioningError::Rejected("invalid role".to_string())
        );
        let err = service.delete_employee("emp-1").await.unwrap_err();
        assert!(matches!(
            err,
            ProvisioningError::Remote(RemoteError::Status { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_find_user_by_national_id() {
        let (service, http) = service(vec![
            ApiResponse::new(404),
            ApiResponse::json(
                200,
                &json!({"id": "acc-1", "email": "ada@x.com", "nationalId": "12345678"}),
            ),
        ]);

        assert_eq!(service.find_user_by_national_id("12345678").await.unwrap(), None);
        let found = service
            .find_user_by_national_id("12345678")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "acc-1");
        assert_eq!(
            http.sent.lock()[0].url,
            "https://api.test/users/by-national-id/12345678"
        );
    }

    #[tokio::test]
    async fn test_transport_failure_is_remote_error() {
        let (service, _) = service(vec![]);
        assert!(matches!(
            service.delete_employee("emp-1").await,
            Err(ProvisioningError::Remote(RemoteError::Other(_)))
        ));
    }
}
