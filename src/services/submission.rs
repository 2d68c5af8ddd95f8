use thiserror::Error;

use crate::database::models::{Identity, Response};
use crate::database::StoreError;
use crate::services::responses::ResponseRepository;
use crate::services::validation::{validate_submission, SubmissionRequest, ValidationError};

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("User has already completed the questionnaire")]
    AlreadySubmitted,

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Validate a raw questionnaire body and store it for `owner`.
/// Field errors are reported before the one-response-per-user check.
pub async fn submit(
    repo: &ResponseRepository,
    owner: &Identity,
    raw: &SubmissionRequest,
    ip_address: Option<String>,
) -> Result<Response, SubmissionError> {
    let submission = validate_submission(raw)?;
    repo.create(owner, submission, ip_address).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin_and_user, repository, valid_request};

    fn request(body: serde_json::Value) -> SubmissionRequest {
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn invalid_body_is_reported_even_after_submitting() {
        let (store, repo) = repository();
        let (_, user) = admin_and_user(&store).await;
        submit(&repo, &user, &request(valid_request()), None).await.unwrap();

        let mut body = valid_request();
        body["companySize"] = serde_json::json!("huge");
        let err = submit(&repo, &user, &request(body), None).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Validation(v) if v.field == "companySize"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submissions_store_exactly_one() {
        let (store, repo) = repository();
        let (_, user) = admin_and_user(&store).await;
        let raw = request(valid_request());

        let attempts = (0..8).map(|_| {
            let (repo, user, raw) = (repo.clone(), user.clone(), raw.clone());
            tokio::spawn(async move { submit(&repo, &user, &raw, None).await })
        });
        let results = futures::future::join_all(attempts).await;

        let stored = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Ok(Err(SubmissionError::AlreadySubmitted))))
            .count();
        assert_eq!(stored, 1);
        assert_eq!(rejected, 7);
    }
}
