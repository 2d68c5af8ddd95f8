use axum::extract::State;
use serde::Serialize;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::Stats;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatsBody {
    pub stats: Stats,
}

/// GET /api/admin/stats - aggregate counts and distributions, computed fresh
pub async fn stats(State(state): State<AppState>) -> ApiResult<StatsBody> {
    let stats = state.responses.stats().await?;
    Ok(ApiResponse::success(StatsBody { stats }))
}
