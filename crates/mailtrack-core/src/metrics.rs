//! Prometheus metrics helpers for the tracking service.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mailtrack_core::metrics::{init_metrics, start_metrics_server};
//!
//! let handle = init_metrics();
//! start_metrics_server(9091, handle).await?;
//!
//! metrics::counter!("tracking_requests_total", "endpoint" => "pixel").increment(1);
//! ```
//!
//! # Metric Naming Conventions
//!
//! - Prefix: `tracking_`
//! - Suffix: `_total` for counters
//! - Labels: low cardinality only (endpoint, kind, outcome, error kind). Never
//!   label by recipient.

use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

/// Initialize the Prometheus metrics recorder.
///
/// Must be called once at startup before any metrics are recorded.
///
/// # Panics
///
/// Panics if called more than once (the recorder can only be installed once).
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    register_metrics();

    handle
}

/// Start the Prometheus metrics HTTP server on `0.0.0.0:{port}/metrics`.
///
/// Binds before returning so a port clash is reported to the caller, then
/// serves from a background task.
pub async fn start_metrics_server(
    port: u16,
    handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Metrics server listening on http://{}/metrics", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "metrics server stopped");
        }
    });

    Ok(())
}

/// Register descriptions for every metric the service emits.
fn register_metrics() {
    // =========================================================================
    // Edge
    // =========================================================================

    describe_counter!(
        "tracking_requests_total",
        "Tracking requests received (label: endpoint)"
    );
    describe_counter!(
        "tracking_bot_hits_total",
        "Requests classified as automated and not recorded (labels: endpoint, reason)"
    );
    describe_counter!(
        "tracking_decode_failures_total",
        "Requests whose identity token could not be decoded (label: endpoint)"
    );

    // =========================================================================
    // Reconciliation
    // =========================================================================

    describe_counter!(
        "tracking_events_total",
        "Reconciled events (labels: kind, outcome = created|updated|dropped)"
    );
    describe_counter!(
        "tracking_attempt_failures_total",
        "Failed reconciliation attempts (label: error = auth|transport|timeout|...)"
    );
    describe_gauge!(
        "tracking_tasks_in_flight",
        "Background reconciliations that have not finished yet"
    );

    // =========================================================================
    // Token service
    // =========================================================================

    describe_counter!(
        "tracking_token_exchanges_total",
        "Service-account token exchanges (label: outcome = ok|error)"
    );
}
