use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{AuthError, AuthService};
use crate::cli::utils::{connect_store, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::models::{Identity, Response, Role};
use crate::database::{normalize_email, Constraint, Store, StoreError};
use crate::services::{validate_submission, SubmissionRequest};

/// Demo data bundled into the binary.
pub const DEFAULT_FIXTURE: &str = include_str!("../../../fixtures/seed.yaml");

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub users: Vec<SeedUser>,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    pub response: Option<SeedResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedResponse {
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub answers: SubmissionRequest,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub identities_created: usize,
    pub responses_created: usize,
    pub skipped: usize,
}

pub fn parse_fixture(source: &str) -> anyhow::Result<SeedFile> {
    serde_yaml::from_str(source).context("invalid seed fixture")
}

/// Insert fixture accounts and their responses. Accounts or responses that
/// already exist are left alone, so seeding twice is harmless.
pub async fn seed_store(store: &Arc<dyn Store>, auth: &AuthService, fixture: &SeedFile) -> anyhow::Result<SeedReport> {
    let mut report = SeedReport::default();

    for user in &fixture.users {
        let identity = match auth.create_identity(&user.email, &user.password, user.role).await {
            Ok(identity) => {
                report.identities_created += 1;
                identity
            }
            Err(AuthError::EmailTaken) => {
                report.skipped += 1;
                existing_identity(store, &user.email).await?
            }
            Err(e) => return Err(e).with_context(|| format!("failed to seed {}", user.email)),
        };

        let Some(seeded) = &user.response else {
            continue;
        };

        let submission = validate_submission(&seeded.answers)
            .with_context(|| format!("invalid response for {}", user.email))?;
        let response = Response {
            id: Uuid::new_v4(),
            owner_id: identity.id,
            email: identity.email.clone(),
            answers: submission.answers,
            submitted_at: seeded.submitted_at.unwrap_or_else(Utc::now),
            ip_address: None,
            referral_source: submission.referral_source,
        };

        match store.insert_response(&response).await {
            Ok(()) => report.responses_created += 1,
            Err(StoreError::Conflict(Constraint::ResponseOwner)) => {
                report.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
        store.refresh_completion(identity.id).await?;
    }

    info!(
        "Seeded {} identities and {} responses ({} skipped)",
        report.identities_created, report.responses_created, report.skipped
    );
    Ok(report)
}

async fn existing_identity(store: &Arc<dyn Store>, email: &str) -> anyhow::Result<Identity> {
    store
        .find_credentials(&normalize_email(email))
        .await?
        .map(|record| record.identity)
        .with_context(|| format!("{} reported as taken but not found", email))
}

pub async fn handle(file: Option<PathBuf>, reset: bool, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    let source = match &file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => DEFAULT_FIXTURE.to_string(),
    };
    let fixture = parse_fixture(&source)?;

    let pg = connect_store(&config).await?;
    let store: Arc<dyn Store> = Arc::new(pg.clone());
    if reset {
        warn!("Purging all identities and responses");
        store.purge().await?;
    }

    let auth = AuthService::new(store.clone(), &config.security);
    let report = seed_store(&store, &auth, &fixture).await?;
    pg.close().await;

    output_success(
        output_format,
        &format!(
            "Seeded {} identities and {} responses",
            report.identities_created, report.responses_created
        ),
        Some(json!({
            "identitiesCreated": report.identities_created,
            "responsesCreated": report.responses_created,
            "skipped": report.skipped,
        })),
    )
}
