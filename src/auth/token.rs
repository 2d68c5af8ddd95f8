use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;
use crate::config::{SecurityConfig, MAX_TOKEN_LIFETIME_HOURS};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Identity id
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signer/verifier built from the injected security settings.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenSigner {
    pub fn new(config: &SecurityConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            lifetime: lifetime_hours(config.jwt_expiry_hours),
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn issue(&self, identity_id: Uuid) -> Result<String, AuthError> {
        self.issue_at(identity_id, Utc::now())
    }

    pub(crate) fn issue_at(&self, identity_id: Uuid, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = Claims {
            sub: identity_id,
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Uuid, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims.sub)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            })
    }
}

/// Clamp to the accepted maximum so the conversion can neither wrap nor
/// overflow `Duration`.
fn lifetime_hours(hours: u64) -> Duration {
    let hours = i64::try_from(hours.min(MAX_TOKEN_LIFETIME_HOURS)).unwrap_or(0);
    Duration::hours(hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn signer(secret: &str) -> TokenSigner {
        let mut config = AppConfig::development();
        config.security.jwt_secret = secret.to_string();
        TokenSigner::new(&config.security)
    }

    #[test]
    fn issued_token_verifies_to_same_identity() {
        let signer = signer("alpha");
        let id = Uuid::new_v4();
        let token = signer.issue(id).unwrap();
        assert_eq!(signer.verify(&token).unwrap(), id);
    }

    #[test]
    fn default_lifetime_is_seven_days() {
        assert_eq!(signer("alpha").lifetime(), Duration::days(7));
    }

    #[test]
    fn oversized_lifetime_is_clamped_instead_of_wrapping() {
        let mut config = AppConfig::development();
        config.security.jwt_secret = "alpha".to_string();
        config.security.jwt_expiry_hours = u64::MAX;

        let signer = TokenSigner::new(&config.security);
        assert_eq!(signer.lifetime(), Duration::hours(MAX_TOKEN_LIFETIME_HOURS as i64));
        let id = Uuid::new_v4();
        assert_eq!(signer.verify(&signer.issue(id).unwrap()).unwrap(), id);
    }

    #[test]
    fn expired_token_is_distinguished() {
        let signer = signer("alpha");
        let token = signer
            .issue_at(Uuid::new_v4(), Utc::now() - Duration::days(8))
            .unwrap();
        assert!(matches!(signer.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn foreign_signature_and_garbage_are_invalid() {
        let token = signer("alpha").issue(Uuid::new_v4()).unwrap();
        assert!(matches!(signer("beta").verify(&token), Err(AuthError::TokenInvalid)));
        assert!(matches!(signer("alpha").verify("not.a.jwt"), Err(AuthError::TokenInvalid)));
    }
}
