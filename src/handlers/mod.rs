mod event;
mod health;
mod metrics;
mod stats;
mod view;

use axum::{Router, routing::{get, post}};
use std::sync::Arc;
use crate::state::AppState;

pub use event::event_handler;
pub use health::{health_handler, welcome_handler};
pub use metrics::metrics_handler;
pub use stats::{STATS_ENDPOINT, stats_handler};
pub use view::{view_category_handler, view_handler};

// creating the router with routes
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(welcome_handler))
        .route("/view", get(view_handler))
        .route("/view/{category}", get(view_category_handler))
        .route("/event", post(event_handler))
        .route("/stats", get(stats_handler)) // rate limited
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}
