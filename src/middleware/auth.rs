use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{AuthError, AuthService};
use crate::database::models::Identity;
use crate::error::ApiError;
use crate::state::AppState;

pub const NO_TOKEN: &str = "Access denied. No token provided.";
pub const INVALID_TOKEN: &str = "Invalid token.";
pub const EXPIRED_TOKEN: &str = "Token has expired.";
pub const UNKNOWN_USER: &str = "Invalid token. User not found.";
pub const ADMIN_REQUIRED: &str = "Admin access required.";

/// Identity resolved from the bearer token, inserted into request extensions
/// by [`require_identity`].
#[derive(Clone, Debug)]
pub struct CurrentUser(pub Identity);

/// Resolve the caller from the `Authorization: Bearer <token>` header.
/// The identity is read fresh from storage on every request.
pub async fn authenticate(auth: &AuthService, headers: &HeaderMap) -> Result<Identity, ApiError> {
    let token = extract_bearer(headers).ok_or_else(|| ApiError::unauthenticated(NO_TOKEN))?;

    let identity_id = auth.verify_token(token).map_err(|e| match e {
        AuthError::TokenExpired => ApiError::unauthenticated(EXPIRED_TOKEN),
        _ => ApiError::unauthenticated(INVALID_TOKEN),
    })?;

    auth.resolve(identity_id)
        .await?
        .ok_or_else(|| ApiError::unauthenticated(UNKNOWN_USER))
}

pub fn require_admin(identity: &Identity) -> Result<(), ApiError> {
    if identity.is_admin() {
        Ok(())
    } else {
        Err(ApiError::unauthorized(ADMIN_REQUIRED))
    }
}

/// Gate for every authenticated route.
pub async fn require_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = authenticate(&state.auth, request.headers()).await?;
    request.extensions_mut().insert(CurrentUser(identity));
    Ok(next.run(request).await)
}

/// Admin gate. Must run after [`require_identity`] so that a missing or bad
/// token is reported as 401 before the role check yields 403.
pub async fn require_admin_layer(request: Request, next: Next) -> Result<Response, ApiError> {
    let CurrentUser(identity) = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| ApiError::unauthenticated(NO_TOKEN))?;
    require_admin(identity)?;
    Ok(next.run(request).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
