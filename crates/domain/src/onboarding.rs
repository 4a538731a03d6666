//! Records exchanged with the provisioning service when onboarding staff.

use serde::{Deserialize, Serialize};

/// Employee data submitted for creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmployee {
    /// National identity number, unique per person.
    pub national_id: String,
    /// Full name.
    pub full_name: String,
    /// Work email, also used for the system account.
    pub email: String,
    /// Job title.
    #[serde(default)]
    pub position: Option<String>,
}

/// An employee as stored by the provisioning service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    /// Server-side id.
    pub id: String,
    /// National identity number.
    pub national_id: String,
    /// Full name.
    pub full_name: String,
    /// Work email.
    pub email: String,
}

/// System account requested for an employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserAccount {
    /// Login email.
    pub email: String,
    /// National identity number linking the account to the employee.
    pub national_id: String,
    /// Role name.
    pub role: String,
    /// Employee id the account belongs to; filled in by the onboarding flow.
    #[serde(default)]
    pub employee_id: Option<String>,
}

/// A system account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    /// Server-side id.
    pub id: String,
    /// Login email.
    pub email: String,
    /// National identity number.
    pub national_id: String,
}
