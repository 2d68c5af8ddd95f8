use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

closed_enum! {
    /// Account role; only `admin` may use the dashboard routes.
    Role {
        User => "user",
        Admin => "admin",
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

/// A registered account as seen by everything except the credential check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub has_completed_questionnaire: bool,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Identity plus its password hash. Only the credential store reads this.
#[derive(Debug, Clone)]
pub struct IdentityRecord {
    pub identity: Identity,
    pub password_hash: String,
}

/// The `user` object returned by register and login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub has_completed_questionnaire: bool,
}

impl From<&Identity> for UserView {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            email: identity.email.clone(),
            role: identity.role,
            has_completed_questionnaire: identity.has_completed_questionnaire,
        }
    }
}

/// Owner projection joined onto each response in the admin listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&Identity> for OwnerSummary {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            email: identity.email.clone(),
            role: identity.role,
            created_at: identity.created_at,
        }
    }
}
