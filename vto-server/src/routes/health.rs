//! Liveness and health endpoints.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::executor::QueueSnapshot;
use crate::relay::messages;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub mode: String,
    pub result_links: bool,
    pub sessions: usize,
    pub cached_results: usize,
    pub queue: Option<QueueSnapshot>,
}

/// GET / - static liveness text
pub async fn liveness() -> &'static str {
    messages::LIVENESS
}

/// GET /health - runtime counters
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    let sessions = state.relay.sessions().len().await;
    let cached_results = state.results.len().await;

    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        mode: state.relay.executor().mode().to_string(),
        result_links: state.config.public_base_url.is_some(),
        sessions,
        cached_results,
        queue: state.queue_stats.as_ref().map(|stats| stats.snapshot()),
    })
}
