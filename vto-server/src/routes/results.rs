//! Synthesis result downloads.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use crate::state::AppState;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// GET /results/{id} - cached try-on image
pub async fn get_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    let result = state
        .results
        .get(&id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Result not found".to_string()))?;

    debug!(result_id = %id, len = result.bytes.len(), "Serving result");

    let content_type = result
        .content_type
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    Ok(([(header::CONTENT_TYPE, content_type)], result.bytes).into_response())
}
