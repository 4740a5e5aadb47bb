use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error surfaced to HTTP clients as `{"error": "..."}`.
///
/// Wraps `anyhow::Error` so handlers can use `?` on anything; the
/// status defaults to 500 unless a handler tags it otherwise.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    inner: anyhow::Error,
}

impl ApiError {
    pub fn bad_request<E: Into<anyhow::Error>>(e: E) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            inner: e.into(),
        }
    }

    pub fn internal<E: Into<anyhow::Error>>(e: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            inner: e.into(),
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(e: E) -> Self {
        Self::internal(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.inner.to_string() }))).into_response()
    }
}
