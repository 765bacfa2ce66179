//! Axum router construction for the metrics API.
//!
//! CORS is permissive because the snapshot is public dashboard data
//! served cross-origin; the webhook carries its own bearer secret.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// - `GET /api/metrics` -- fetch/serve the metrics snapshot
/// - `POST /api/redeploy` -- deploy-hook webhook (bearer secret)
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/metrics", get(handlers::get_metrics))
        .route("/api/redeploy", post(handlers::redeploy))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
