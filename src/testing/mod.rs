//! Fixtures shared by the unit tests. Everything runs against `MemoryStore`.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::models::{
    Identity, IdentityRecord, Response, ResponseFacets, ResponseFilter, ResponseWithOwner, Role,
};
use crate::database::{MemoryStore, Store, StoreError};
use crate::services::ResponseRepository;
use crate::state::AppState;

pub const TEST_SECRET: &str = "unit-test-secret";

/// Development profile with a fixed secret, the cheapest bcrypt cost and a
/// near-zero retry delay.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = TEST_SECRET.to_string();
    config.security.bcrypt_cost = 4;
    config.cascade.retry_delay_ms = 1;
    config
}

pub fn test_state() -> AppState {
    AppState::new(test_config(), Arc::new(MemoryStore::new()))
}

pub fn repository() -> (Arc<dyn Store>, ResponseRepository) {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let repo = ResponseRepository::new(store.clone(), test_config().cascade);
    (store, repo)
}

/// Insert an identity directly, skipping password hashing.
pub async fn insert_identity(store: &Arc<dyn Store>, email: &str, role: Role) -> Identity {
    let identity = Identity {
        id: Uuid::new_v4(),
        email: email.to_string(),
        role,
        has_completed_questionnaire: false,
        created_at: Utc::now(),
    };
    store
        .insert_identity(&IdentityRecord {
            identity: identity.clone(),
            password_hash: "not-a-real-hash".to_string(),
        })
        .await
        .expect("insert identity");
    identity
}

pub async fn admin_and_user(store: &Arc<dyn Store>) -> (Identity, Identity) {
    let admin = insert_identity(store, "admin@example.com", Role::Admin).await;
    let user = insert_identity(store, "user@example.com", Role::User).await;
    (admin, user)
}

/// Bearer token for an identity already present in `state`.
pub fn bearer(state: &AppState, identity: &Identity) -> String {
    let token = state.auth.issue_token(identity.id).expect("issue token");
    format!("Bearer {}", token)
}

pub fn valid_request() -> Value {
    json!({
        "companyName": "Acme Coffee",
        "companySize": "1-10",
        "industry": "retail",
        "primaryUseCase": "menu-boards",
        "numberOfScreens": "1-5",
        "technicalProficiency": "beginner",
        "featureInterests": ["scheduling", "mobile-app"],
        "referralSource": "search"
    })
}

/// `MemoryStore` wrapper that can fail pings, hide existing responses from
/// the pre-check, fail or delay completion-flag writes, and count those writes.
#[derive(Default)]
pub struct ScriptedStore {
    pub inner: MemoryStore,
    pub fail_ping: bool,
    pub hide_existing_responses: bool,
    pub fail_refresh: bool,
    pub refresh_calls: AtomicU32,
    /// Milliseconds to sleep before the next flag write only.
    pub delay_next_refresh_ms: AtomicU64,
}

#[async_trait]
impl Store for ScriptedStore {
    async fn ping(&self) -> Result<(), StoreError> {
        if self.fail_ping {
            return Err(StoreError::Corrupt("scripted ping failure".to_string()));
        }
        self.inner.ping().await
    }

    async fn insert_identity(&self, record: &IdentityRecord) -> Result<(), StoreError> {
        self.inner.insert_identity(record).await
    }

    async fn find_identity(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        self.inner.find_identity(id).await
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<IdentityRecord>, StoreError> {
        self.inner.find_credentials(email).await
    }

    async fn refresh_completion(&self, id: Uuid) -> Result<Option<bool>, StoreError> {
        let delay = self.delay_next_refresh_ms.swap(0, Ordering::SeqCst);
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_refresh {
            return Err(StoreError::Corrupt("scripted flag write failure".to_string()));
        }
        self.inner.refresh_completion(id).await
    }

    async fn count_identities(&self) -> Result<i64, StoreError> {
        self.inner.count_identities().await
    }

    async fn count_completed(&self) -> Result<i64, StoreError> {
        self.inner.count_completed().await
    }

    async fn response_exists_for_owner(&self, owner_id: Uuid) -> Result<bool, StoreError> {
        if self.hide_existing_responses {
            return Ok(false);
        }
        self.inner.response_exists_for_owner(owner_id).await
    }

    async fn insert_response(&self, response: &Response) -> Result<(), StoreError> {
        self.inner.insert_response(response).await
    }

    async fn find_response(&self, id: Uuid) -> Result<Option<Response>, StoreError> {
        self.inner.find_response(id).await
    }

    async fn find_response_by_owner(&self, owner_id: Uuid) -> Result<Option<Response>, StoreError> {
        self.inner.find_response_by_owner(owner_id).await
    }

    async fn list_responses(&self, filter: &ResponseFilter) -> Result<Vec<ResponseWithOwner>, StoreError> {
        self.inner.list_responses(filter).await
    }

    async fn delete_response(&self, id: Uuid) -> Result<bool, StoreError> {
        self.inner.delete_response(id).await
    }

    async fn response_facets(&self) -> Result<Vec<ResponseFacets>, StoreError> {
        self.inner.response_facets().await
    }

    async fn reconcile_completion_flags(&self) -> Result<u64, StoreError> {
        self.inner.reconcile_completion_flags().await
    }

    async fn purge(&self) -> Result<(), StoreError> {
        self.inner.purge().await
    }
}

/// Repository over a shared [`ScriptedStore`], three retry attempts.
pub fn scripted_repository(scripted: ScriptedStore) -> (Arc<ScriptedStore>, ResponseRepository) {
    let scripted = Arc::new(scripted);
    let repo = ResponseRepository::new(scripted.clone(), test_config().cascade);
    (scripted, repo)
}
