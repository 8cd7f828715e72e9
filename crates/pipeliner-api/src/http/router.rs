//! Axum router configuration with middleware.
//!
//! `POST /` is the configuration-extension endpoint. Any other method on `/`
//! is answered with 405 before signature verification runs.
//!
//! The request body is read without a size limit: the CI server includes
//! every configuration file of the repository in it.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(handlers::pipeline::serve_pipeline))
        .route("/health", get(handlers::health::health_check))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
