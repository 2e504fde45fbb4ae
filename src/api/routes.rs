//! API route definitions

use axum::routing::get;
use axum::routing::post;
use axum::Router;

use super::handlers;
use super::handlers::AppState;

/// Create RESTful API router
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/assistant", post(handlers::assistant))
        .route("/assistant/knowledge", post(handlers::upsert_knowledge))
        .route("/debug/inference", get(handlers::debug_inference))
        .route("/stats", get(handlers::stats))
        .with_state(state)
}
