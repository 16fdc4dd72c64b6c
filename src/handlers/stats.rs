use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use crate::models::StatsResponse;
use crate::rate_limit::RateDecision;
use crate::state::AppState;

pub const STATS_ENDPOINT: &str = "stats";

// GET /stats - live and stored counts, behind the fixed-window limiter
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.limiters.check(STATS_ENDPOINT) {
        RateDecision::Denied { retry_after } => {
            tracing::info!("Rate limit exceeded on /{}, retry in {:?}", STATS_ENDPOINT, retry_after);
            // round up so clients never retry inside the window
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, secs.to_string())],
                "Too many requests",
            )
                .into_response()
        }
        RateDecision::Allowed { remaining } => {
            let live = state.aggregator.snapshot();
            let stored = state.store.totals();
            Json(StatsResponse::new(&live, &stored, remaining)).into_response()
        }
    }
}
