use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{Identity, IdentityRecord, OwnerSummary, Response, ResponseFacets, ResponseFilter, ResponseWithOwner};
use super::{Constraint, Store, StoreError};

#[derive(Default)]
struct Tables {
    identities: HashMap<Uuid, IdentityRecord>,
    /// normalized email -> identity id
    emails: HashMap<String, Uuid>,
    responses: HashMap<Uuid, Response>,
    /// owner id -> response id
    owners: HashMap<Uuid, Uuid>,
}

/// Process-local store for tests and `serve --in-memory`.
///
/// Both uniqueness indexes are checked and updated under the same write
/// guard, so concurrent duplicate inserts resolve exactly like the unique
/// constraints in PostgreSQL.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_identity(&self, record: &IdentityRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let key = record.identity.email.to_lowercase();
        if tables.emails.contains_key(&key) {
            return Err(StoreError::Conflict(Constraint::IdentityEmail));
        }
        tables.emails.insert(key, record.identity.id);
        tables.identities.insert(record.identity.id, record.clone());
        Ok(())
    }

    async fn find_identity(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.identities.get(&id).map(|r| r.identity.clone()))
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<IdentityRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .emails
            .get(&email.to_lowercase())
            .and_then(|id| tables.identities.get(id))
            .cloned())
    }

    async fn refresh_completion(&self, id: Uuid) -> Result<Option<bool>, StoreError> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;
        let completed = tables.owners.contains_key(&id);
        Ok(tables.identities.get_mut(&id).map(|record| {
            record.identity.has_completed_questionnaire = completed;
            completed
        }))
    }

    async fn count_identities(&self) -> Result<i64, StoreError> {
        Ok(self.tables.read().await.identities.len() as i64)
    }

    async fn count_completed(&self) -> Result<i64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .identities
            .values()
            .filter(|r| r.identity.has_completed_questionnaire)
            .count() as i64)
    }

    async fn response_exists_for_owner(&self, owner_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.read().await.owners.contains_key(&owner_id))
    }

    async fn insert_response(&self, response: &Response) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.owners.contains_key(&response.owner_id) {
            return Err(StoreError::Conflict(Constraint::ResponseOwner));
        }
        if !tables.identities.contains_key(&response.owner_id) {
            return Err(StoreError::Corrupt(format!(
                "response owner {} does not exist",
                response.owner_id
            )));
        }
        tables.owners.insert(response.owner_id, response.id);
        tables.responses.insert(response.id, response.clone());
        Ok(())
    }

    async fn find_response(&self, id: Uuid) -> Result<Option<Response>, StoreError> {
        Ok(self.tables.read().await.responses.get(&id).cloned())
    }

    async fn find_response_by_owner(&self, owner_id: Uuid) -> Result<Option<Response>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .owners
            .get(&owner_id)
            .and_then(|id| tables.responses.get(id))
            .cloned())
    }

    async fn list_responses(&self, filter: &ResponseFilter) -> Result<Vec<ResponseWithOwner>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows = Vec::with_capacity(tables.responses.len());
        for response in tables.responses.values().filter(|r| filter.matches(r)) {
            let owner = tables.identities.get(&response.owner_id).ok_or_else(|| {
                StoreError::Corrupt(format!("response {} has no owner", response.id))
            })?;
            rows.push(ResponseWithOwner {
                response: response.clone(),
                owner: OwnerSummary::from(&owner.identity),
            });
        }
        rows.sort_by(|a, b| {
            b.response
                .submitted_at
                .cmp(&a.response.submitted_at)
                .then_with(|| a.response.id.cmp(&b.response.id))
        });
        Ok(rows)
    }

    async fn delete_response(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.responses.remove(&id) {
            Some(response) => {
                tables.owners.remove(&response.owner_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn response_facets(&self) -> Result<Vec<ResponseFacets>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.responses.values().map(ResponseFacets::from).collect())
    }

    async fn reconcile_completion_flags(&self) -> Result<u64, StoreError> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;
        let mut changed = 0;
        for (id, record) in tables.identities.iter_mut() {
            let completed = tables.owners.contains_key(id);
            if record.identity.has_completed_questionnaire != completed {
                record.identity.has_completed_questionnaire = completed;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn purge(&self) -> Result<(), StoreError> {
        *self.tables.write().await = Tables::default();
        Ok(())
    }
}
