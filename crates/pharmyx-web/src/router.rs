//! Axum router — maps URL paths to handlers.

use std::sync::Arc;

use axum::{routing::post, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::papers::fetch_papers;
use crate::state::{AppState, SharedState};

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    Router::new()
        .route("/api/fetch-papers", post(fetch_papers))
        // Middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
