// handlers/mod.rs - three security tiers
//
// Public (no auth) → Protected (bearer token) → Elevated (bearer token + admin role)

pub mod elevated;
pub mod protected;
pub mod public;

use crate::error::ApiError;

/// Fallback for every unmatched route.
pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
