use axum::{Json, extract::State};
use chrono::Utc;
use std::sync::Arc;
use crate::error::ApiError;
use crate::models::{EventRequest, EventResponse};
use crate::state::AppState;

// POST /event - ingest one view or click for an explicit category
pub async fn event_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EventRequest>,
) -> Result<Json<EventResponse>, ApiError> {
    let ts = payload.timestamp.unwrap_or_else(Utc::now);
    let key = state
        .aggregator
        .record(&payload.category, &payload.event_type, ts)?;

    // the bucket may have been flushed in between, in which case it reads as zero
    let counts = state.aggregator.get(&key).unwrap_or_default();
    Ok(Json(EventResponse {
        key: key.to_string(),
        counts,
    }))
}
