use axum::response::sse::Event;
use serde::Serialize;

// ── SSE Event Structs ───────────────────────────────────────────────────
//
// `snapshot` and `done` events carry a `paperentry_core::SessionSnapshot`
// as-is; only request-level failures need their own shape.

#[derive(Serialize)]
pub struct ErrorEvent {
    pub message: String,
}

// ── Health ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: String,
    pub max_document_mb: u32,
}

// ── SSE Helper ──────────────────────────────────────────────────────────

pub fn sse_event<T: Serialize>(event_type: &str, data: &T) -> Event {
    Event::default()
        .event(event_type)
        .data(serde_json::to_string(data).unwrap_or_default())
}
