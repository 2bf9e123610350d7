//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, upstream
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_upstream_health` (gauge): 1=healthy, 0=unhealthy
//! - `gateway_rate_limited_total` (counter): admission rejections
//! - `gateway_degraded_selections_total` (counter): fallback selections

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, upstream: &str, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "upstream" => upstream.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_health(upstream: &str, healthy: bool) {
    metrics::gauge!("gateway_upstream_health", "upstream" => upstream.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_rate_limited() {
    metrics::counter!("gateway_rate_limited_total").increment(1);
}

pub fn record_degraded_selection() {
    metrics::counter!("gateway_degraded_selections_total").increment(1);
}
