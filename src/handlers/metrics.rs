use axum::http::header;
use axum::response::IntoResponse;
use crate::error::ApiError;
use crate::metrics::encode_metrics;

pub async fn metrics_handler() -> Result<impl IntoResponse, ApiError> {
    let body = encode_metrics().map_err(ApiError::Metrics)?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
