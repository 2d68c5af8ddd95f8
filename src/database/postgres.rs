use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::models::{
    Answers, Identity, IdentityRecord, OwnerSummary, Response, ResponseFacets, ResponseFilter,
    ResponseWithOwner, UnknownVariant,
};
use super::{Constraint, Store, StoreError};
use crate::config::DatabaseConfig;

const RESPONSE_COLUMNS: &str = "r.id, r.owner_id, r.email, r.account_country, r.company_name, \
     r.company_size, r.industry, r.primary_use_case, r.use_case_description, r.number_of_screens, \
     r.screen_locations, r.technical_proficiency, r.current_platform, r.feature_interests, \
     r.additional_comments, r.submitted_at, r.ip_address, r.referral_source";

const IDENTITY_COLUMNS: &str = "id, email, role, has_completed_questionnaire, created_at";

/// PostgreSQL-backed store. Uniqueness is enforced by `identities_email_key`
/// and `responses_owner_id_key` (see `migrations/`).
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config
            .url
            .as_deref()
            .ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Created database pool for: {}", redact_url(url)?);
        Ok(Self { pool })
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Strip the password from a connection URL so it can be logged.
fn redact_url(raw: &str) -> Result<String, StoreError> {
    let mut url = url::Url::parse(raw).map_err(|_| StoreError::InvalidDatabaseUrl)?;
    if url.password().is_some() {
        url.set_password(Some("***")).map_err(|_| StoreError::InvalidDatabaseUrl)?;
    }
    Ok(url.into())
}

/// Map a SQLSTATE and constraint name to one of the constraints the core
/// cares about.
fn constraint_violation(code: Option<&str>, constraint: Option<&str>) -> Option<Constraint> {
    if code != Some("23505") {
        return None;
    }
    constraint.and_then(Constraint::from_name)
}

fn translate(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        let code = db.code();
        if let Some(c) = constraint_violation(code.as_deref(), db.constraint()) {
            return StoreError::Conflict(c);
        }
    }
    StoreError::Sqlx(err)
}

fn corrupt(err: UnknownVariant) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

/// Escape LIKE metacharacters so user search terms match literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn list_query(filter: &ResponseFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {RESPONSE_COLUMNS}, i.email AS owner_email, i.role AS owner_role, \
         i.created_at AS owner_created_at \
         FROM responses r JOIN identities i ON i.id = r.owner_id WHERE TRUE"
    ));
    if let Some(industry) = filter.industry {
        qb.push(" AND r.industry = ").push_bind(industry.as_str());
    }
    if let Some(size) = filter.company_size {
        qb.push(" AND r.company_size = ").push_bind(size.as_str());
    }
    if let Some(term) = &filter.search {
        let pattern = format!("%{}%", escape_like(term));
        qb.push(" AND (r.company_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR r.email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    qb.push(" ORDER BY r.submitted_at DESC, r.id");
    qb
}

#[derive(Debug, FromRow)]
struct IdentityRow {
    id: Uuid,
    email: String,
    role: String,
    has_completed_questionnaire: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<IdentityRow> for Identity {
    type Error = StoreError;

    fn try_from(row: IdentityRow) -> Result<Self, Self::Error> {
        Ok(Identity {
            id: row.id,
            email: row.email,
            role: row.role.parse().map_err(corrupt)?,
            has_completed_questionnaire: row.has_completed_questionnaire,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    identity: IdentityRow,
    password_hash: String,
}

#[derive(Debug, FromRow)]
struct ResponseRow {
    id: Uuid,
    owner_id: Uuid,
    email: String,
    account_country: Option<String>,
    company_name: String,
    company_size: String,
    industry: String,
    primary_use_case: String,
    use_case_description: Option<String>,
    number_of_screens: String,
    screen_locations: Option<String>,
    technical_proficiency: String,
    current_platform: Option<String>,
    feature_interests: Vec<String>,
    additional_comments: Option<String>,
    submitted_at: DateTime<Utc>,
    ip_address: Option<String>,
    referral_source: Option<String>,
}

impl TryFrom<ResponseRow> for Response {
    type Error = StoreError;

    fn try_from(row: ResponseRow) -> Result<Self, Self::Error> {
        let feature_interests = row
            .feature_interests
            .iter()
            .map(|tag| tag.parse())
            .collect::<Result<Vec<_>, _>>()
            .map_err(corrupt)?;

        Ok(Response {
            id: row.id,
            owner_id: row.owner_id,
            email: row.email,
            answers: Answers {
                account_country: row.account_country,
                company_name: row.company_name,
                company_size: row.company_size.parse().map_err(corrupt)?,
                industry: row.industry.parse().map_err(corrupt)?,
                primary_use_case: row.primary_use_case.parse().map_err(corrupt)?,
                use_case_description: row.use_case_description,
                number_of_screens: row.number_of_screens.parse().map_err(corrupt)?,
                screen_locations: row.screen_locations,
                technical_proficiency: row.technical_proficiency.parse().map_err(corrupt)?,
                current_platform: row.current_platform,
                feature_interests,
                additional_comments: row.additional_comments,
            },
            submitted_at: row.submitted_at,
            ip_address: row.ip_address,
            referral_source: row.referral_source,
        })
    }
}

#[derive(Debug, FromRow)]
struct ListedRow {
    #[sqlx(flatten)]
    response: ResponseRow,
    owner_email: String,
    owner_role: String,
    owner_created_at: DateTime<Utc>,
}

impl TryFrom<ListedRow> for ResponseWithOwner {
    type Error = StoreError;

    fn try_from(row: ListedRow) -> Result<Self, Self::Error> {
        let owner = OwnerSummary {
            id: row.response.owner_id,
            email: row.owner_email,
            role: row.owner_role.parse().map_err(corrupt)?,
            created_at: row.owner_created_at,
        };
        Ok(ResponseWithOwner {
            response: row.response.try_into()?,
            owner,
        })
    }
}

#[derive(Debug, FromRow)]
struct FacetRow {
    company_size: String,
    industry: String,
    feature_interests: Vec<String>,
}

impl TryFrom<FacetRow> for ResponseFacets {
    type Error = StoreError;

    fn try_from(row: FacetRow) -> Result<Self, Self::Error> {
        Ok(ResponseFacets {
            company_size: row.company_size.parse().map_err(corrupt)?,
            industry: row.industry.parse().map_err(corrupt)?,
            feature_interests: row
                .feature_interests
                .iter()
                .map(|tag| tag.parse())
                .collect::<Result<Vec<_>, _>>()
                .map_err(corrupt)?,
        })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_identity(&self, record: &IdentityRecord) -> Result<(), StoreError> {
        let identity = &record.identity;
        sqlx::query(
            "INSERT INTO identities (id, email, password_hash, role, has_completed_questionnaire, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(identity.id)
        .bind(&identity.email)
        .bind(&record.password_hash)
        .bind(identity.role.as_str())
        .bind(identity.has_completed_questionnaire)
        .bind(identity.created_at)
        .execute(&self.pool)
        .await
        .map_err(translate)?;
        Ok(())
    }

    async fn find_identity(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM identities WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Identity::try_from).transpose()
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<IdentityRecord>, StoreError> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {IDENTITY_COLUMNS}, password_hash FROM identities WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(IdentityRecord {
                identity: row.identity.try_into()?,
                password_hash: row.password_hash,
            })
        })
        .transpose()
    }

    async fn refresh_completion(&self, id: Uuid) -> Result<Option<bool>, StoreError> {
        let flag: Option<(bool,)> = sqlx::query_as(
            r#"
            UPDATE identities
            SET has_completed_questionnaire = EXISTS (SELECT 1 FROM responses WHERE owner_id = $1)
            WHERE id = $1
            RETURNING has_completed_questionnaire
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(flag.map(|(completed,)| completed))
    }

    async fn count_identities(&self) -> Result<i64, StoreError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM identities")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    async fn count_completed(&self) -> Result<i64, StoreError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM identities WHERE has_completed_questionnaire")
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0)
    }

    async fn response_exists_for_owner(&self, owner_id: Uuid) -> Result<bool, StoreError> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM responses WHERE owner_id = $1)")
                .bind(owner_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists.0)
    }

    async fn insert_response(&self, response: &Response) -> Result<(), StoreError> {
        let answers = &response.answers;
        let tags: Vec<String> = answers.feature_interests.iter().map(|t| t.as_str().to_string()).collect();
        sqlx::query(
            r#"
            INSERT INTO responses (
                id, owner_id, email, account_country, company_name, company_size, industry,
                primary_use_case, use_case_description, number_of_screens, screen_locations,
                technical_proficiency, current_platform, feature_interests, additional_comments,
                submitted_at, ip_address, referral_source
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(response.id)
        .bind(response.owner_id)
        .bind(&response.email)
        .bind(&answers.account_country)
        .bind(&answers.company_name)
        .bind(answers.company_size.as_str())
        .bind(answers.industry.as_str())
        .bind(answers.primary_use_case.as_str())
        .bind(&answers.use_case_description)
        .bind(answers.number_of_screens.as_str())
        .bind(&answers.screen_locations)
        .bind(answers.technical_proficiency.as_str())
        .bind(&answers.current_platform)
        .bind(&tags)
        .bind(&answers.additional_comments)
        .bind(response.submitted_at)
        .bind(&response.ip_address)
        .bind(&response.referral_source)
        .execute(&self.pool)
        .await
        .map_err(translate)?;
        Ok(())
    }

    async fn find_response(&self, id: Uuid) -> Result<Option<Response>, StoreError> {
        let row = sqlx::query_as::<_, ResponseRow>(&format!(
            "SELECT {RESPONSE_COLUMNS} FROM responses r WHERE r.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Response::try_from).transpose()
    }

    async fn find_response_by_owner(&self, owner_id: Uuid) -> Result<Option<Response>, StoreError> {
        let row = sqlx::query_as::<_, ResponseRow>(&format!(
            "SELECT {RESPONSE_COLUMNS} FROM responses r WHERE r.owner_id = $1"
        ))
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Response::try_from).transpose()
    }

    async fn list_responses(&self, filter: &ResponseFilter) -> Result<Vec<ResponseWithOwner>, StoreError> {
        let rows = list_query(filter)
            .build_query_as::<ListedRow>()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(ResponseWithOwner::try_from).collect()
    }

    async fn delete_response(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM responses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn response_facets(&self) -> Result<Vec<ResponseFacets>, StoreError> {
        let rows = sqlx::query_as::<_, FacetRow>(
            "SELECT company_size, industry, feature_interests FROM responses",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ResponseFacets::try_from).collect()
    }

    async fn reconcile_completion_flags(&self) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE identities i
            SET has_completed_questionnaire = NOT i.has_completed_questionnaire
            WHERE i.has_completed_questionnaire
                <> EXISTS (SELECT 1 FROM responses r WHERE r.owner_id = i.id)
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn purge(&self) -> Result<(), StoreError> {
        sqlx::query("TRUNCATE responses, identities").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{CompanySize, Industry};

    #[test]
    fn only_known_unique_violations_become_conflicts() {
        assert_eq!(
            constraint_violation(Some("23505"), Some("responses_owner_id_key")),
            Some(Constraint::ResponseOwner)
        );
        assert_eq!(
            constraint_violation(Some("23505"), Some("identities_email_key")),
            Some(Constraint::IdentityEmail)
        );
        assert_eq!(constraint_violation(Some("23505"), Some("responses_pkey")), None);
        assert_eq!(constraint_violation(Some("23503"), Some("responses_owner_id_key")), None);
        assert_eq!(constraint_violation(None, None), None);
    }

    #[test]
    fn list_query_binds_every_filter() {
        let filter = ResponseFilter {
            industry: Some(Industry::Retail),
            company_size: Some(CompanySize::Small),
            search: Some("50%_off".to_string()),
        };
        let qb = list_query(&filter);
        let sql = qb.sql();
        assert!(sql.contains("r.industry = $1"));
        assert!(sql.contains("r.company_size = $2"));
        assert!(sql.contains("r.company_name ILIKE $3 OR r.email ILIKE $4"));
        assert!(sql.ends_with("ORDER BY r.submitted_at DESC, r.id"));
    }

    #[test]
    fn unfiltered_list_query_has_no_binds() {
        let qb = list_query(&ResponseFilter::default());
        assert!(!qb.sql().contains('$'));
    }

    #[test]
    fn escapes_like_metacharacters() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn redacts_password_in_url() {
        let redacted = redact_url("postgres://app:hunter2@db:5432/onboarding").unwrap();
        assert_eq!(redacted, "postgres://app:***@db:5432/onboarding");
        assert!(matches!(redact_url("not a url"), Err(StoreError::InvalidDatabaseUrl)));
    }
}
