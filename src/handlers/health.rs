use axum::{Json, response::IntoResponse};

pub async fn welcome_handler() -> &'static str {
    "Welcome to the content counter"
}

pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
