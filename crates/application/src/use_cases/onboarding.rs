//! Employee onboarding use case.
//!
//! Creates an employee record and then the matching system account. The
//! two calls hit separate resources with no shared transaction, so a failed
//! account creation is compensated by deleting the employee again.

use std::sync::Arc;
use std::time::Duration;

use tessera_domain::{Employee, NewEmployee, NewUserAccount, UserAccount};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::SessionConfig;
use crate::ports::{ProvisioningError, ProvisioningService};

/// Input for onboarding one employee.
#[derive(Debug, Clone)]
pub struct OnboardingInput {
    /// The employee to create.
    pub employee: NewEmployee,
    /// Role of the new account.
    pub role: String,
}

/// How the account was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountOrigin {
    /// A new account was registered.
    Created,
    /// The person already had an account; it was looked up and reused.
    Linked,
}

/// Result of a completed onboarding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardingOutcome {
    /// The created employee.
    pub employee: Employee,
    /// The employee's account.
    pub account: UserAccount,
    /// Whether the account is new.
    pub origin: AccountOrigin,
}

/// Onboarding failures.
#[derive(Debug, Error)]
pub enum OnboardingError {
    /// The employee could not be created; nothing was left behind.
    #[error("could not create employee after {attempts} attempts: {source}")]
    EmployeeCreation {
        /// Attempts made.
        attempts: u32,
        /// Last failure.
        #[source]
        source: ProvisioningError,
    },

    /// The account could not be created; the employee was deleted again.
    #[error("could not create account, employee {employee_id} was rolled back: {source}")]
    AccountCreation {
        /// Id of the removed employee.
        employee_id: String,
        /// Account creation failure.
        #[source]
        source: ProvisioningError,
    },

    /// The account could not be created and deleting the employee failed too.
    /// The employee record is orphaned and needs manual cleanup.
    #[error(
        "employee {orphaned_employee_id} is orphaned: account creation failed ({source}) and rollback failed ({rollback})"
    )]
    CriticalFailure {
        /// Id of the employee left behind.
        orphaned_employee_id: String,
        /// Account creation failure.
        #[source]
        source: ProvisioningError,
        /// Rollback failure.
        rollback: ProvisioningError,
    },
}

/// Use case creating an employee and its account as one unit.
pub struct EmployeeOnboarding {
    provisioning: Arc<dyn ProvisioningService>,
    attempts: u32,
    retry_delay: Duration,
}

impl EmployeeOnboarding {
    /// Creates the use case.
    #[must_use]
    pub fn new(provisioning: Arc<dyn ProvisioningService>, config: &SessionConfig) -> Self {
        Self {
            provisioning,
            attempts: config.onboarding_attempts.max(1),
            retry_delay: config.onboarding_retry_delay,
        }
    }

    /// Onboards one employee.
    ///
    /// Employee creation is retried with a fixed delay. Account creation
    /// runs once; when the person already has an account it is reused.
    ///
    /// # Errors
    ///
    /// See [`OnboardingError`]. [`OnboardingError::CriticalFailure`] is also
    /// logged at error level with the orphaned id.
    pub async fn execute(
        &self,
        input: OnboardingInput,
    ) -> Result<OnboardingOutcome, OnboardingError> {
        let employee = self.create_employee(&input.employee).await?;
        info!(employee_id = %employee.id, "employee created");

        let account = NewUserAccount {
            email: employee.email.clone(),
            national_id: employee.national_id.clone(),
            role: input.role,
            employee_id: Some(employee.id.clone()),
        };

        match self.register_account(&account).await {
            Ok((account, origin)) => {
                info!(
                    employee_id = %employee.id,
                    account_id = %account.id,
                    ?origin,
                    "employee onboarded"
                );
                Ok(OnboardingOutcome {
                    employee,
                    account,
                    origin,
                })
            }
            Err(source) => Err(self.roll_back(employee, source).await),
        }
    }

    async fn create_employee(&self, employee: &NewEmployee) -> Result<Employee, OnboardingError> {
        let mut attempt = 1;
        loop {
            match self.provisioning.create_employee(employee).await {
                Ok(created) => return Ok(created),
                Err(source) if attempt >= self.attempts => {
                    return Err(OnboardingError::EmployeeCreation {
                        attempts: attempt,
                        source,
                    });
                }
                Err(e) => {
                    warn!(attempt, max = self.attempts, error = %e, "employee creation failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn register_account(
        &self,
        account: &NewUserAccount,
    ) -> Result<(UserAccount, AccountOrigin), ProvisioningError> {
        let conflict = match self.provisioning.register_user(account).await {
            Ok(created) => return Ok((created, AccountOrigin::Created)),
            Err(e) if e.is_conflict() => e,
            Err(e) => return Err(e),
        };

        info!(error = %conflict, "account already exists, looking it up");
        match self
            .provisioning
            .find_user_by_national_id(&account.national_id)
            .await
        {
            Ok(Some(existing)) => Ok((existing, AccountOrigin::Linked)),
            Ok(None) => {
                warn!("conflicting account not found");
                Err(conflict)
            }
            Err(e) => {
                warn!(error = %e, "lookup of conflicting account failed");
                Err(conflict)
            }
        }
    }

    async fn roll_back(&self, employee: Employee, source: ProvisioningError) -> OnboardingError {
        warn!(employee_id = %employee.id, error = %source, "account creation failed, deleting employee");
        match self.provisioning.delete_employee(&employee.id).await {
            Ok(()) => OnboardingError::AccountCreation {
                employee_id: employee.id,
                source,
            },
            Err(rollback) => {
                error!(
                    employee_id = %employee.id,
                    error = %source,
                    rollback_error = %rollback,
                    "rollback failed, employee record is orphaned"
                );
                OnboardingError::CriticalFailure {
                    orphaned_employee_id: employee.id,
                    source,
                    rollback,
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::ports::RemoteError;
    use crate::testing::FakeProvisioning;
    use pretty_assertions::assert_eq;
    use tokio::time::Instant;

    fn input() -> OnboardingInput {
        OnboardingInput {
            employee: NewEmployee {
                national_id: "12345678".to_string(),
                full_name: "Ada Lovelace".to_string(),
                email: "ada@x.com".to_string(),
                position: None,
            },
            role: "employee".to_string(),
        }
    }

    fn onboarding(fake: &Arc<FakeProvisioning>) -> EmployeeOnboarding {
        EmployeeOnboarding::new(fake.clone(), &SessionConfig::default())
    }

    fn offline() -> ProvisioningError {
        ProvisioningError::Remote(RemoteError::Connectivity("offline".to_string()))
    }

    #[tokio::test]
    async fn test_creates_employee_and_account() {
        let fake = Arc::new(FakeProvisioning::default());

        let outcome = onboarding(&fake).execute(input()).await.unwrap();

        assert_eq!(outcome.origin, AccountOrigin::Created);
        assert_eq!(outcome.employee.id, "emp-12345678");
        assert_eq!(
            fake.registered.lock()[0].employee_id.as_deref(),
            Some("emp-12345678")
        );
        assert!(fake.deleted.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_employee_creation_retries_with_fixed_delay() {
        let fake = Arc::new(FakeProvisioning::default());
        fake.create_failures.lock().extend([offline(), offline()]);

        let started = Instant::now();
        let outcome = onboarding(&fake).execute(input()).await.unwrap();

        assert_eq!(*fake.create_attempts.lock(), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(3000));
        assert_eq!(outcome.origin, AccountOrigin::Created);
    }

    #[tokio::test(start_paused = true)]
    async fn test_employee_creation_gives_up_after_three_attempts() {
        let fake = Arc::new(FakeProvisioning::default());
        fake.create_failures
            .lock()
            .extend([offline(), offline(), offline(), offline()]);

        let err = onboarding(&fake).execute(input()).await.unwrap_err();

        assert!(matches!(err, OnboardingError::EmployeeCreation { attempts: 3, .. }));
        assert_eq!(*fake.create_attempts.lock(), 3);
        assert!(fake.registered.lock().is_empty());
    }

    #[tokio::test]
    async fn test_account_failure_deletes_employee_once() {
        let fake = Arc::new(FakeProvisioning::default());
        *fake.register_error.lock() = Some(ProvisioningError::Rejected("bad role".to_string()));

        let err = onboarding(&fake).execute(input()).await.unwrap_err();

        assert_eq!(*fake.deleted.lock(), vec!["emp-12345678".to_string()]);
        match err {
            OnboardingError::AccountCreation {
                employee_id,
                source,
            } => {
                assert_eq!(employee_id, "emp-12345678");
                assert_eq!(source, ProvisioningError::Rejected("bad role".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_existing_account_is_linked() {
        let fake = Arc::new(FakeProvisioning::default());
        *fake.register_error.lock() = Some(ProvisioningError::EmailAlreadyRegistered);
        *fake.existing.lock() = Some(UserAccount {
            id: "acc-old".to_string(),
            email: "ada@x.com".to_string(),
            national_id: "12345678".to_string(),
        });

        let outcome = onboarding(&fake).execute(input()).await.unwrap();

        assert_eq!(outcome.origin, AccountOrigin::Linked);
        assert_eq!(outcome.account.id, "acc-old");
        assert!(fake.deleted.lock().is_empty());
    }

    #[tokio::test]
    async fn test_conflict_without_existing_account_rolls_back() {
        let fake = Arc::new(FakeProvisioning::default());
        *fake.register_error.lock() = Some(ProvisioningError::AlreadyExists);

        let err = onboarding(&fake).execute(input()).await.unwrap_err();

        assert!(matches!(err, OnboardingError::AccountCreation { .. }));
        assert_eq!(fake.deleted.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_rollback_reports_orphan() {
        let fake = Arc::new(FakeProvisioning::default());
        *fake.register_error.lock() = Some(ProvisioningError::Rejected("bad role".to_string()));
        *fake.delete_error.lock() = Some(offline());

        let err = onboarding(&fake).execute(input()).await.unwrap_err();

        match err {
            OnboardingError::CriticalFailure {
                orphaned_employee_id,
                rollback,
                ..
            } => {
                assert_eq!(orphaned_employee_id, "emp-12345678");
                assert_eq!(rollback, offline());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(fake.deleted.lock().len(), 1);
    }
}
