use axum::Json;
use axum::extract::State;
use std::sync::Arc;

use crate::models::HealthResponse;
use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model: state.capability.name().to_string(),
        max_document_mb: state.config.max_document_mb,
    })
}
