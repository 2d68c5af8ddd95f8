pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;

#[cfg(test)]
pub mod testing;

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{elevated, protected, public};
use crate::middleware::{require_admin_layer, require_identity};

pub use config::AppConfig;
pub use state::AppState;

/// Build the full HTTP application over the given state.
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.api.max_request_size_bytes;

    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .merge(elevated_routes(state.clone()))
        .fallback(handlers::not_found)
        // Global middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(public::health))
        .route("/api/auth/register", post(public::register))
        .route("/api/auth/login", post(public::login))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/auth/me", get(protected::me))
        .route("/api/responses", post(protected::submit_response))
        .route("/api/responses/me", get(protected::my_response))
        .route_layer(from_fn_with_state(state, require_identity))
}

fn elevated_routes(state: AppState) -> Router<AppState> {
    // Layers run outermost-last: identity first, then role
    Router::new()
        .route("/api/admin/responses", get(elevated::list_responses))
        .route("/api/admin/responses/:id", delete(elevated::delete_response))
        .route("/api/admin/stats", get(elevated::stats))
        .route_layer(from_fn(require_admin_layer))
        .route_layer(from_fn_with_state(state, require_identity))
}
