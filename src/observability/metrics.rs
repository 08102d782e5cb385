//! Metrics collection and exposition.
//!
//! # Metrics
//! - `todo_http_requests_total` (counter): requests by method, status
//! - `todo_http_request_duration_seconds` (histogram): latency by method
//! - `todo_store_items` (gauge): item count seen by the last retention tick
//! - `todo_retention_evictions_total` (counter): items removed by retention
//! - `todo_retention_failures_total` (counter): abandoned retention ticks
//!
//! Without an installed recorder every call is a no-op.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    counter!(
        "todo_http_requests_total",
        "method" => method.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("todo_http_request_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_item_count(backend: &'static str, count: usize) {
    gauge!("todo_store_items", "backend" => backend).set(count as f64);
}

pub fn record_eviction(backend: &'static str) {
    counter!("todo_retention_evictions_total", "backend" => backend).increment(1);
}

pub fn record_retention_failure(backend: &'static str) {
    counter!("todo_retention_failures_total", "backend" => backend).increment(1);
}
