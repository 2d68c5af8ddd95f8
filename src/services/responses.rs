use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::CascadeConfig;
use crate::database::models::{Identity, Response, ResponseFilter, ResponseWithOwner};
use crate::database::{Constraint, Store, StoreError};
use crate::services::stats::{self, Snapshot, Stats};
use crate::services::submission::SubmissionError;
use crate::services::validation::ValidatedSubmission;

pub const NO_RESPONSE_FOR_USER: &str = "No questionnaire response found for this user";
pub const RESPONSE_NOT_FOUND: &str = "Response not found";

/// Response lifecycle on top of a [`Store`]: one response per owner, with
/// the owner's completion flag kept in step after every insert and delete.
#[derive(Clone)]
pub struct ResponseRepository {
    store: Arc<dyn Store>,
    cascade: CascadeConfig,
}

impl ResponseRepository {
    pub fn new(store: Arc<dyn Store>, cascade: CascadeConfig) -> Self {
        Self { store, cascade }
    }

    /// Persist a validated submission for `owner`. Fails with
    /// `AlreadySubmitted` if the owner already has a response, including when
    /// a concurrent submission wins the race to insert.
    pub async fn create(
        &self,
        owner: &Identity,
        submission: ValidatedSubmission,
        ip_address: Option<String>,
    ) -> Result<Response, SubmissionError> {
        if self.store.response_exists_for_owner(owner.id).await? {
            return Err(SubmissionError::AlreadySubmitted);
        }

        let response = Response {
            id: Uuid::new_v4(),
            owner_id: owner.id,
            email: owner.email.clone(),
            answers: submission.answers,
            submitted_at: Utc::now(),
            ip_address,
            referral_source: submission.referral_source,
        };

        match self.store.insert_response(&response).await {
            Ok(()) => {}
            Err(StoreError::Conflict(Constraint::ResponseOwner)) => {
                return Err(SubmissionError::AlreadySubmitted)
            }
            Err(e) => return Err(e.into()),
        }

        info!("Stored response {} for {}", response.id, owner.id);
        self.sync_completion(owner.id).await;
        Ok(response)
    }

    pub async fn find_by_owner(&self, owner_id: Uuid) -> Result<Response, SubmissionError> {
        self.store
            .find_response_by_owner(owner_id)
            .await?
            .ok_or_else(|| SubmissionError::NotFound(NO_RESPONSE_FOR_USER.to_string()))
    }

    pub async fn find_all(&self, filter: &ResponseFilter) -> Result<Vec<ResponseWithOwner>, SubmissionError> {
        Ok(self.store.list_responses(filter).await?)
    }

    /// Remove a response and clear its owner's completion flag. The flag
    /// reset never fails the delete; see [`Self::sync_completion`].
    pub async fn delete_by_id(&self, id: Uuid) -> Result<(), SubmissionError> {
        let response = self
            .store
            .find_response(id)
            .await?
            .ok_or_else(|| SubmissionError::NotFound(RESPONSE_NOT_FOUND.to_string()))?;

        if !self.store.delete_response(id).await? {
            // Lost a race with another delete
            return Err(SubmissionError::NotFound(RESPONSE_NOT_FOUND.to_string()));
        }

        info!("Deleted response {} owned by {}", id, response.owner_id);
        self.sync_completion(response.owner_id).await;
        Ok(())
    }

    /// Recompute the owner's completion flag from the responses table,
    /// retrying with linear backoff. Because the flag is derived rather than
    /// written as a fixed value, a late refresh from an earlier delete cannot
    /// clobber a newer submission. On final failure the drift is logged and
    /// left for `reconcile`.
    pub async fn sync_completion(&self, owner_id: Uuid) -> bool {
        let attempts = self.cascade.retry_attempts.max(1);

        for attempt in 1..=attempts {
            match self.store.refresh_completion(owner_id).await {
                Ok(Some(_)) => return true,
                Ok(None) => {
                    warn!("Completion flag not updated: identity {} no longer exists", owner_id);
                    return false;
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        "Completion flag refresh failed for {} (attempt {}/{}): {}",
                        owner_id, attempt, attempts, e
                    );
                    tokio::time::sleep(self.cascade.retry_delay() * attempt).await;
                }
                Err(e) => {
                    error!(
                        "Completion flag for {} left out of sync after {} attempts: {}",
                        owner_id, attempts, e
                    );
                }
            }
        }
        false
    }

    pub async fn stats(&self) -> Result<Stats, SubmissionError> {
        let (total_users, users_completed, facets) = futures::try_join!(
            self.store.count_identities(),
            self.store.count_completed(),
            self.store.response_facets(),
        )?;

        Ok(stats::summarize(&Snapshot {
            total_users,
            users_completed,
            facets,
        }))
    }
}
