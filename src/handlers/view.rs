use axum::{Json, extract::{Path, State}};
use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use crate::counter::EventType;
use crate::models::ViewResponse;
use crate::processor::should_click;
use crate::state::{AppState, DEFAULT_CATEGORIES};

// GET /view - a view on a random category from the default vocabulary
pub async fn view_handler(State(state): State<Arc<AppState>>) -> Json<ViewResponse> {
    let category = {
        let idx = rand::thread_rng().gen_range(0..DEFAULT_CATEGORIES.len());
        DEFAULT_CATEGORIES[idx]
    };
    Json(count_view(&state, category).await)
}

// GET /view/{category}
pub async fn view_category_handler(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> Json<ViewResponse> {
    Json(count_view(&state, &category).await)
}

async fn count_view(state: &AppState, category: &str) -> ViewResponse {
    let now = Utc::now();
    let key = state.aggregator.increment(category, EventType::View, now);

    // no aggregator lock is held while the upstream work runs
    let delay = state.processor.process().await;

    let clicked = should_click(state.click_probability);
    if clicked {
        state.aggregator.increment(category, EventType::Click, now);
    }

    ViewResponse {
        key: key.to_string(),
        clicked,
        processing_ms: delay.as_millis() as u64,
    }
}
