//! Error responses for the rare cases the edge cannot degrade gracefully.

use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Errors that reach the HTTP boundary.
///
/// Details are logged; clients only ever see a generic body.
#[derive(Debug, thiserror::Error)]
pub enum EdgeError {
    /// A handler panicked.
    #[error("handler panicked: {0}")]
    Panic(String),

    /// Anything else unexpected.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl EdgeError {
    /// Build from a payload caught by `CatchPanicLayer`.
    pub fn from_panic(payload: Box<dyn Any + Send + 'static>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panic(message)
    }
}

/// JSON error response body.
#[derive(Debug, Clone, Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: &'static str,
}

impl IntoResponse for EdgeError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        let body = ErrorResponse {
            error: "internal_error",
            message: "An internal error occurred",
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// `CatchPanicLayer` handler for routes without a better fallback.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    EdgeError::from_panic(payload).into_response()
}
