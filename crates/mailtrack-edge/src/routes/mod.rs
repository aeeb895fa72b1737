//! HTTP route definitions.

mod click;
mod pixel;
mod status;

use axum::extract::rejection::PathRejection;
use axum::extract::Path;
use axum::http::{HeaderMap, Uri};
use axum::middleware;
use axum::routing::any;
use axum::Router;
use mailtrack_core::{
    classify, BotVerdict, DEFAULT_LINK_ID, EventKind, EventMetadata, Identity, TrackingEvent,
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::cors::cors;
use crate::error::panic_response;
use crate::state::AppState;

pub use self::pixel::PIXEL_GIF;

/// Build the edge router.
///
/// # Route Structure
///
/// - `/p/{token}.gif` - Open pixel (always a GIF, any method)
/// - `/c/{token}/{link_id}` - Click redirect (always a 302, any method)
/// - `OPTIONS *` - Empty 200 with CORS headers
/// - anything else - Status JSON
///
/// Tracking routes have their own panic fallback so a bug never breaks an
/// image or a link; everything else falls back to a generic 500.
pub fn router(state: AppState) -> Router {
    let fallback_target = state.redirects.resolve(DEFAULT_LINK_ID).to_string();

    let pixel_routes = Router::new()
        .route("/p/", any(pixel::pixel_without_token))
        .route("/p/{*path}", any(pixel::pixel))
        .layer(CatchPanicLayer::custom(pixel::panic_pixel));

    let click_routes = Router::new()
        .route("/c/", any(click::click_without_token))
        .route("/c/{*path}", any(click::click))
        .layer(CatchPanicLayer::custom(click::panic_redirect(fallback_target)));

    Router::new()
        .merge(pixel_routes)
        .merge(click_routes)
        .fallback(status::status)
        .layer(middleware::from_fn(cors))
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

/// Decode and screen a tracking hit. Returns the event to record, or `None`
/// for undecodable tokens and automated traffic.
fn admit(
    endpoint: &'static str,
    token: &str,
    kind: EventKind,
    metadata: EventMetadata,
) -> Option<TrackingEvent> {
    let identity = match Identity::from_token(token) {
        Ok(identity) => identity,
        Err(e) => {
            metrics::counter!("tracking_decode_failures_total", "endpoint" => endpoint)
                .increment(1);
            tracing::debug!(endpoint, error = %e, "ignoring undecodable token");
            return None;
        }
    };

    if let BotVerdict::Bot(reason) =
        classify(metadata.user_agent.as_deref(), metadata.referer.as_deref())
    {
        metrics::counter!(
            "tracking_bot_hits_total",
            "endpoint" => endpoint,
            "reason" => reason.label()
        )
        .increment(1);
        tracing::info!(endpoint, email = %identity, reason = %reason, "ignoring automated request");
        return None;
    }

    tracing::debug!(endpoint, email = %identity, kind = %kind, "tracking hit");
    Some(TrackingEvent::new(identity, kind, metadata))
}

/// The wildcard tail of a tracking path.
///
/// A capture that does not percent-decode to UTF-8 falls back to the raw
/// path, so the handler still answers with its image or redirect.
fn captured_tail(
    captured: Result<Path<String>, PathRejection>,
    uri: &Uri,
    prefix: &str,
) -> String {
    match captured {
        Ok(Path(tail)) => tail,
        Err(rejection) => {
            tracing::debug!(path = %uri.path(), error = %rejection, "using raw tracking path");
            uri.path()
                .strip_prefix(prefix)
                .unwrap_or_default()
                .to_string()
        }
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
