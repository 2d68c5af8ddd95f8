use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::database::models::{Identity, UserView};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub token: String,
    pub user: UserView,
}

fn session(state: &AppState, identity: &Identity, message: Option<&'static str>) -> Result<SessionBody, ApiError> {
    Ok(SessionBody {
        message,
        token: state.auth.issue_token(identity.id)?,
        user: UserView::from(identity),
    })
}

/// POST /api/auth/register - create a `user` account and sign it in
///
/// ```json
/// { "email": "jane@example.com", "password": "secret1" }
/// ```
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<SessionBody> {
    let Json(credentials) = body?;
    let identity = state.auth.register(&credentials.email, &credentials.password).await?;
    Ok(ApiResponse::created(session(&state, &identity, Some("User created successfully"))?))
}

/// POST /api/auth/login - exchange credentials for a bearer token
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<SessionBody> {
    let Json(credentials) = body?;
    let identity = state.auth.verify(&credentials.email, &credentials.password).await?;
    Ok(ApiResponse::success(session(&state, &identity, None)?))
}
