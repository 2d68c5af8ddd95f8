// Password hashing. bcrypt is CPU-bound, so both directions run on the
// blocking pool instead of the async workers.

use bcrypt::{hash, verify};

use super::AuthError;

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// bcrypt ignores input past 72 bytes.
pub const MAX_PASSWORD_LENGTH: usize = 72;

pub async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || {
        hash(password, cost).map_err(|e| AuthError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| AuthError::Hashing(format!("Task join error: {}", e)))?
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable.
pub async fn verify_password(password: &str, hashed: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hashed = hashed.to_string();
    tokio::task::spawn_blocking(move || {
        verify(password, &hashed).map_err(|e| AuthError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| AuthError::Hashing(format!("Task join error: {}", e)))?
}
