use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/health - liveness plus a storage round-trip
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    if let Err(e) = state.store.ping().await {
        tracing::error!("Health check failed: {}", e);
        return Err(ApiError::service_unavailable("Database unavailable"));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Server is running",
        "timestamp": chrono::Utc::now(),
        "database": "ok"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_config, test_state, ScriptedStore};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use std::sync::Arc;

    #[tokio::test]
    async fn reports_ok_when_store_answers() {
        let Json(body) = health(State(test_state())).await.unwrap();
        assert_eq!(body["database"], "ok");
    }

    #[tokio::test]
    async fn unreachable_store_is_503() {
        let store = ScriptedStore {
            fail_ping: true,
            ..Default::default()
        };
        let state = AppState::new(test_config(), Arc::new(store));

        let err = health(State(state)).await.unwrap_err();
        assert!(matches!(&err, ApiError::ServiceUnavailable(msg) if msg == "Database unavailable"));
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
