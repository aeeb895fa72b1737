//! `/c/{token}/{link_id}`: click tracking and redirect.

use std::any::Any;

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::header::LOCATION;
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use mailtrack_core::{DEFAULT_LINK_ID, EventKind, EventMetadata};

use super::{admit, captured_tail, header_str};
use crate::error::EdgeError;
use crate::redirect::UNSUBSCRIBE_LINK_ID;
use crate::state::AppState;

/// Redirect to the link's target and record a click in the background.
///
/// Bots and undecodable tokens are still redirected.
pub async fn click(
    State(state): State<AppState>,
    captured: Result<Path<String>, PathRejection>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    metrics::counter!("tracking_requests_total", "endpoint" => "click").increment(1);

    let path = captured_tail(captured, &uri, "/c/");
    let mut segments = path.split('/');
    let token = segments.next().unwrap_or_default();
    let link_id = segments
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_LINK_ID);

    let metadata = EventMetadata {
        link_id: Some(link_id.to_string()),
        user_agent: header_str(&headers, "user-agent"),
        referer: header_str(&headers, "referer"),
    };
    if let Some(event) = admit("click", token, EventKind::Click, metadata) {
        if link_id == UNSUBSCRIBE_LINK_ID {
            tracing::info!(email = %event.identity, "unsubscribe link clicked");
        }
        let reconciler = state.reconciler.clone();
        state.tasks.spawn(async move {
            reconciler.record_event(event).await;
        });
    }

    redirect_to(state.redirects.resolve(link_id))
}

/// `/c/` with no token.
pub async fn click_without_token(State(state): State<AppState>) -> Response {
    metrics::counter!("tracking_requests_total", "endpoint" => "click").increment(1);
    metrics::counter!("tracking_decode_failures_total", "endpoint" => "click").increment(1);
    redirect_to(state.redirects.resolve(DEFAULT_LINK_ID))
}

/// A 302 to `target`, or a generic 500 if it cannot be a header value.
pub fn redirect_to(target: &str) -> Response {
    match HeaderValue::from_str(target) {
        Ok(location) => (StatusCode::FOUND, [(LOCATION, location)]).into_response(),
        Err(e) => EdgeError::Internal(anyhow::anyhow!("redirect target {target:?}: {e}"))
            .into_response(),
    }
}

/// Panic fallback for click routes: redirect to `fallback`.
pub fn panic_redirect(
    fallback: String,
) -> impl Fn(Box<dyn Any + Send + 'static>) -> Response + Clone + Send + Sync + 'static {
    move |payload| {
        tracing::error!(
            error = %EdgeError::from_panic(payload),
            "click handler panicked"
        );
        redirect_to(&fallback)
    }
}
