//! HTTP routes.

pub mod health;
pub mod results;
pub mod webhook;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health::liveness))
        .route("/health", get(health::health_check))
        .route("/webhook", post(webhook::receive_message))
        .route("/results/{id}", get(results::get_result))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
