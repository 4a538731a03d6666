//! Onboarding batch files.
//!
//! A batch file holds one request object or an array of them:
//!
//! ```json
//! [
//!   { "nationalId": "12345678", "fullName": "Ada Lovelace",
//!     "email": "ada@example.com", "position": "Analyst", "role": "employee" }
//! ]
//! ```

use std::path::Path;

use serde::Deserialize;
use tessera_application::OnboardingInput;
use tessera_domain::NewEmployee;

use crate::AppError;

/// Role given to accounts when a request names none.
pub const DEFAULT_ROLE: &str = "employee";

/// One employee to onboard.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRequest {
    /// Employee record.
    #[serde(flatten)]
    pub employee: NewEmployee,
    /// Account role.
    #[serde(default)]
    pub role: Option<String>,
}

impl OnboardingRequest {
    /// Convert to the use case input, falling back to `default_role`.
    #[must_use]
    pub fn into_input(self, default_role: &str) -> OnboardingInput {
        OnboardingInput {
            employee: self.employee,
            role: self.role.unwrap_or_else(|| default_role.to_string()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Batch {
    Many(Vec<OnboardingRequest>),
    One(OnboardingRequest),
}

/// Parse a batch from JSON text.
///
/// # Errors
///
/// Returns [`AppError::Batch`] if the text is not a request or a list of them.
pub fn parse_requests(json: &str) -> Result<Vec<OnboardingRequest>, AppError> {
    Ok(match serde_json::from_str(json)? {
        Batch::Many(requests) => requests,
        Batch::One(request) => vec![request],
    })
}

/// Read a batch file.
///
/// # Errors
///
/// Returns [`AppError::Io`] or [`AppError::Batch`].
pub async fn load_requests(path: &Path) -> Result<Vec<OnboardingRequest>, AppError> {
    let json = tokio::fs::read_to_string(path).await?;
    parse_requests(&json)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_request_and_default_role() {
        let requests = parse_requests(
            r#"{"nationalId":"1","fullName":"Ada","email":"ada@x.com"}"#,
        )
        .unwrap();

        assert_eq!(requests.len(), 1);
        let input = requests[0].clone().into_input(DEFAULT_ROLE);
        assert_eq!(input.role, "employee");
        assert_eq!(input.employee.national_id, "1");
        assert_eq!(input.employee.position, None);
    }

    #[test]
    fn test_request_list() {
        let requests = parse_requests(
            r#"[
                {"nationalId":"1","fullName":"Ada","email":"ada@x.com","role":"admin"},
                {"nationalId":"2","fullName":"Alan","email":"alan@x.com","position":"Analyst"}
            ]"#,
        )
        .unwrap();

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].role.as_deref(), Some("admin"));
        assert_eq!(requests[1].employee.position.as_deref(), Some("Analyst"));
    }

    #[test]
    fn test_missing_field_is_rejected() {
        assert!(matches!(
            parse_requests(r#"{"fullName":"Ada"}"#),
            Err(AppError::Batch(_))
        ));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let path = dir.path().join("batch.json");
        tokio::fs::write(&path, r#"{"nationalId":"1","fullName":"Ada","email":"a@x.com"}"#)
            .await
            .unwrap();

        assert_eq!(load_requests(&path).await.unwrap().len(), 1);
    }
}
