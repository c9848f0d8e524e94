//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method and status
//! - `proxy_request_duration_seconds` (histogram): end-to-end latency by method
//! - `proxy_query_rewrites_total` (counter): rewrite outcomes (`rewritten`, `unchanged`, `parse_error`)
//! - `proxy_upstream_errors_total` (counter): failures by kind (`transport`, `decode`, `encode`)

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("proxy_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record the outcome of a query rewrite.
pub fn record_rewrite(outcome: &'static str) {
    ::metrics::counter!("proxy_query_rewrites_total", "outcome" => outcome).increment(1);
}

/// Record a request that failed between the proxy and its upstream.
pub fn record_upstream_error(kind: &'static str) {
    ::metrics::counter!("proxy_upstream_errors_total", "kind" => kind).increment(1);
}
