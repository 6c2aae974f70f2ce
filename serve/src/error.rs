//! HTTP error mapping for pre-stream failures. Once the SSE stream has
//! begun, errors become in-stream RUN_ERROR events instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    /// Missing user message and similar semantic problems (400).
    BadRequest(String),
    /// Ingress validation failures (422).
    Unprocessable(String),
    /// Configuration not loaded or matcher not built yet (503).
    NotReady(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            ApiError::Unprocessable(detail) => (StatusCode::UNPROCESSABLE_ENTITY, detail),
            ApiError::NotReady(detail) => (StatusCode::SERVICE_UNAVAILABLE, detail.to_string()),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
