pub mod password;
pub mod token;

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::database::models::{Identity, IdentityRecord, Role};
use crate::database::{normalize_email, Constraint, Store, StoreError};
use crate::services::validation::ValidationError;

pub use token::{Claims, TokenSigner};

/// Hashed once per service so unknown-email logins still pay for a bcrypt
/// comparison at the configured cost.
const TIMING_PLACEHOLDER_PASSWORD: &str = "placeholder-password-never-matches";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Email already exists")]
    EmailTaken,

    /// Same variant whether the email is unknown or the password is wrong.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Password hashing error: {0}")]
    Hashing(String),

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Credential store and verifier: owns registration, password checks and
/// bearer tokens.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    signer: TokenSigner,
    bcrypt_cost: u32,
    placeholder_hash: Arc<OnceCell<String>>,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, config: &SecurityConfig) -> Self {
        Self {
            store,
            signer: TokenSigner::new(config),
            bcrypt_cost: config.bcrypt_cost,
            placeholder_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Create a regular `user` account.
    pub async fn register(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.create_identity(email, password, Role::User).await
    }

    /// Create an account with an explicit role. Used by `register` and seeding.
    pub async fn create_identity(&self, email: &str, password: &str, role: Role) -> Result<Identity, AuthError> {
        validate_email_format(email)?;
        validate_new_password(password)?;
        let email = normalize_email(email);

        if self.store.find_credentials(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let identity = Identity {
            id: Uuid::new_v4(),
            email,
            role,
            has_completed_questionnaire: false,
            created_at: Utc::now(),
        };
        let record = IdentityRecord {
            identity: identity.clone(),
            password_hash: password::hash_password(password, self.bcrypt_cost).await?,
        };

        // A concurrent registration can slip past the lookup above
        match self.store.insert_identity(&record).await {
            Ok(()) => {}
            Err(StoreError::Conflict(Constraint::IdentityEmail)) => return Err(AuthError::EmailTaken),
            Err(e) => return Err(e.into()),
        }

        info!("Registered {} ({})", identity.id, identity.role);
        Ok(identity)
    }

    /// Check an email/password pair. Unknown email and wrong password are
    /// indistinguishable to the caller.
    pub async fn verify(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        validate_email_format(email)?;
        if password.is_empty() {
            return Err(ValidationError::new("password", "Password is required").into());
        }

        let Some(record) = self.store.find_credentials(&normalize_email(email)).await? else {
            warn!("Login rejected: unknown email");
            if let Ok(placeholder) = self.placeholder_hash().await {
                let _ = password::verify_password(password, placeholder).await;
            }
            return Err(AuthError::InvalidCredentials);
        };

        if !password::verify_password(password, &record.password_hash).await? {
            warn!("Login rejected: wrong password for {}", record.identity.id);
            return Err(AuthError::InvalidCredentials);
        }

        Ok(record.identity)
    }

    async fn placeholder_hash(&self) -> Result<&str, AuthError> {
        self.placeholder_hash
            .get_or_try_init(|| password::hash_password(TIMING_PLACEHOLDER_PASSWORD, self.bcrypt_cost))
            .await
            .map(String::as_str)
    }

    pub fn issue_token(&self, identity_id: Uuid) -> Result<String, AuthError> {
        self.signer.issue(identity_id)
    }

    pub fn verify_token(&self, token: &str) -> Result<Uuid, AuthError> {
        self.signer.verify(token)
    }

    /// Look up the identity a token was issued for, without its hash.
    pub async fn resolve(&self, identity_id: Uuid) -> Result<Option<Identity>, AuthError> {
        Ok(self.store.find_identity(identity_id).await?)
    }
}

/// Basic shape check for email addresses.
pub fn validate_email_format(email: &str) -> Result<(), ValidationError> {
    const MESSAGE: &str = "Please provide a valid email address";

    let email = email.trim();
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(ValidationError::new("email", MESSAGE));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::new("email", MESSAGE));
    };
    if local.is_empty() || domain.contains('@') {
        return Err(ValidationError::new("email", MESSAGE));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(ValidationError::new("email", MESSAGE));
    }

    Ok(())
}

fn validate_new_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < password::MIN_PASSWORD_LENGTH {
        return Err(ValidationError::new(
            "password",
            format!("Password must be at least {} characters long", password::MIN_PASSWORD_LENGTH),
        ));
    }
    if password.len() > password::MAX_PASSWORD_LENGTH {
        return Err(ValidationError::new(
            "password",
            format!("Password must be at most {} bytes long", password::MAX_PASSWORD_LENGTH),
        ));
    }
    Ok(())
}
