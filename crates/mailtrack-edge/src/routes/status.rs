//! Status payload served for every path that is not a tracking URL.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Endpoints {
    pixel: &'static str,
    click: &'static str,
}

/// Service status and capabilities.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    endpoints: Endpoints,
}

/// Returns basic service status. Doubles as a load balancer probe.
pub async fn status() -> Json<StatusResponse> {
    metrics::counter!("tracking_requests_total", "endpoint" => "status").increment(1);
    Json(StatusResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        endpoints: Endpoints {
            pixel: "/p/{token}.gif",
            click: "/c/{token}/{linkId}",
        },
    })
}
