//! `/p/{token}.gif`: the open-tracking pixel.

use std::any::Any;

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, EXPIRES, PRAGMA};
use axum::http::{HeaderMap, Uri};
use axum::response::{IntoResponse, Response};
use mailtrack_core::{EventKind, EventMetadata};

use super::{admit, captured_tail, header_str};
use crate::state::AppState;

/// 1×1 transparent GIF.
pub const PIXEL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x01, 0x44, 0x00, 0x3b,
];

/// Serve the pixel and record an open in the background.
///
/// The response is identical whether or not the open was recorded.
pub async fn pixel(
    State(state): State<AppState>,
    captured: Result<Path<String>, PathRejection>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    metrics::counter!("tracking_requests_total", "endpoint" => "pixel").increment(1);

    let path = captured_tail(captured, &uri, "/p/");
    let token = path
        .split('/')
        .next()
        .and_then(|segment| segment.split('.').next())
        .unwrap_or_default();

    let metadata = EventMetadata {
        link_id: None,
        user_agent: header_str(&headers, "user-agent"),
        referer: header_str(&headers, "referer"),
    };
    if let Some(event) = admit("pixel", token, EventKind::Open, metadata) {
        let reconciler = state.reconciler.clone();
        state.tasks.spawn(async move {
            reconciler.record_event(event).await;
        });
    }

    pixel_response()
}

/// `/p/` with no token.
pub async fn pixel_without_token() -> Response {
    metrics::counter!("tracking_requests_total", "endpoint" => "pixel").increment(1);
    metrics::counter!("tracking_decode_failures_total", "endpoint" => "pixel").increment(1);
    pixel_response()
}

/// The pixel with headers that stop clients and proxies caching it.
pub fn pixel_response() -> Response {
    (
        [
            (CONTENT_TYPE, "image/gif"),
            (CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
            (PRAGMA, "no-cache"),
            (EXPIRES, "0"),
        ],
        PIXEL_GIF,
    )
        .into_response()
}

/// Panic fallback for pixel routes: still a valid image.
pub fn panic_pixel(payload: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!(
        error = %crate::error::EdgeError::from_panic(payload),
        "pixel handler panicked"
    );
    pixel_response()
}
