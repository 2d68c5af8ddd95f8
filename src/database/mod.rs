pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use models::{Identity, IdentityRecord, Response, ResponseFacets, ResponseFilter, ResponseWithOwner};
pub use postgres::PgStore;

/// Storage-level uniqueness constraints the core relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// One identity per (case-folded) email.
    IdentityEmail,
    /// One response per owner.
    ResponseOwner,
}

impl Constraint {
    pub fn name(&self) -> &'static str {
        match self {
            Constraint::IdentityEmail => "identities_email_key",
            Constraint::ResponseOwner => "responses_owner_id_key",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "identities_email_key" => Some(Constraint::IdentityEmail),
            "responses_owner_id_key" => Some(Constraint::ResponseOwner),
            _ => None,
        }
    }
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors from the storage layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unique constraint violated: {0}")]
    Conflict(Constraint),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Persistence contract for identities and questionnaire responses.
///
/// Implementations must enforce both [`Constraint`]s atomically: a racing
/// duplicate insert fails with [`StoreError::Conflict`] rather than
/// producing a second row. Every call is a fresh read or write; nothing is
/// cached in front of the backing store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap round-trip used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn insert_identity(&self, record: &IdentityRecord) -> Result<(), StoreError>;

    /// Fetch an identity without its password hash.
    async fn find_identity(&self, id: Uuid) -> Result<Option<Identity>, StoreError>;

    /// Fetch an identity with its password hash. `email` is already normalized.
    async fn find_credentials(&self, email: &str) -> Result<Option<IdentityRecord>, StoreError>;

    /// Recompute one identity's completion flag from whether it owns a
    /// response, in a single step. Returns the stored flag, or `None` when
    /// no identity has that id.
    async fn refresh_completion(&self, id: Uuid) -> Result<Option<bool>, StoreError>;

    async fn count_identities(&self) -> Result<i64, StoreError>;

    async fn count_completed(&self) -> Result<i64, StoreError>;

    async fn response_exists_for_owner(&self, owner_id: Uuid) -> Result<bool, StoreError>;

    async fn insert_response(&self, response: &Response) -> Result<(), StoreError>;

    async fn find_response(&self, id: Uuid) -> Result<Option<Response>, StoreError>;

    async fn find_response_by_owner(&self, owner_id: Uuid) -> Result<Option<Response>, StoreError>;

    /// Newest first, joined with the owner projection.
    async fn list_responses(&self, filter: &ResponseFilter) -> Result<Vec<ResponseWithOwner>, StoreError>;

    /// Returns `false` when no response has that id.
    async fn delete_response(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn response_facets(&self) -> Result<Vec<ResponseFacets>, StoreError>;

    /// Recompute every completion flag from response existence.
    /// Returns the number of identities whose flag changed.
    async fn reconcile_completion_flags(&self) -> Result<u64, StoreError>;

    /// Remove every response and identity.
    async fn purge(&self) -> Result<(), StoreError>;
}

/// Normalize an email the way it is stored and looked up.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_names_round_trip() {
        for c in [Constraint::IdentityEmail, Constraint::ResponseOwner] {
            assert_eq!(Constraint::from_name(c.name()), Some(c));
        }
        assert_eq!(Constraint::from_name("responses_pkey"), None);
    }

    #[test]
    fn normalizes_email() {
        assert_eq!(normalize_email("  Jane.Doe@Example.COM "), "jane.doe@example.com");
    }
}
