//! Provisioning service port

use async_trait::async_trait;
use tessera_domain::{Employee, NewEmployee, NewUserAccount, UserAccount};
use thiserror::Error;

use super::RemoteError;

/// Provisioning failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProvisioningError {
    /// An account already exists for this identity.
    #[error("an account already exists for this person")]
    AlreadyExists,

    /// The email address is already registered.
    #[error("email address already registered")]
    EmailAlreadyRegistered,

    /// The server refused the request.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The call failed in transport.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl ProvisioningError {
    /// Returns true if the failure means the account is already there.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyExists | Self::EmailAlreadyRegistered)
    }
}

/// Port for the employee/account provisioning service.
#[async_trait]
pub trait ProvisioningService: Send + Sync {
    /// Create an employee record.
    async fn create_employee(&self, employee: &NewEmployee) -> Result<Employee, ProvisioningError>;

    /// Delete an employee record.
    async fn delete_employee(&self, employee_id: &str) -> Result<(), ProvisioningError>;

    /// Create a system account.
    async fn register_user(&self, account: &NewUserAccount)
    -> Result<UserAccount, ProvisioningError>;

    /// Look up an existing account by national id.
    async fn find_user_by_national_id(
        &self,
        national_id: &str,
    ) -> Result<Option<UserAccount>, ProvisioningError>;
}
