use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::HeaderMap,
    Extension, Json,
};
use serde::Serialize;
use std::net::SocketAddr;
use uuid::Uuid;

use crate::database::models::Response;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::{self, SubmissionError, SubmissionRequest};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedBody {
    pub response_id: Uuid,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MyResponseBody {
    pub response: Response,
}

/// POST /api/responses - submit the questionnaire, once per user
pub async fn submit_response(
    State(state): State<AppState>,
    Extension(CurrentUser(identity)): Extension<CurrentUser>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Json<SubmissionRequest>, JsonRejection>,
) -> ApiResult<SubmittedBody> {
    let Json(raw) = body?;
    let ip_address = client_ip(
        &headers,
        connect_info.map(|ConnectInfo(addr)| addr),
        state.config.api.trust_proxy_headers,
    );

    let response = services::submit(&state.responses, &identity, &raw, ip_address)
        .await
        .map_err(|e| {
            if matches!(e, SubmissionError::AlreadySubmitted) {
                tracing::warn!("Duplicate submission rejected for {}", identity.id);
            }
            e
        })?;

    Ok(ApiResponse::created(SubmittedBody {
        response_id: response.id,
        message: "Thank you for completing the questionnaire!",
    }))
}

/// GET /api/responses/me - the caller's own response
pub async fn my_response(
    State(state): State<AppState>,
    Extension(CurrentUser(identity)): Extension<CurrentUser>,
) -> ApiResult<MyResponseBody> {
    let response = state.responses.find_by_owner(identity.id).await?;
    Ok(ApiResponse::success(MyResponseBody { response }))
}

/// The socket peer address. With `trust_forwarded`, the first
/// `X-Forwarded-For` hop takes precedence.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded: bool) -> Option<String> {
    let forwarded = || {
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    trust_forwarded
        .then(forwarded)
        .flatten()
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}
