//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatcher_requests_total` (counter): dispatched requests by service, status
//! - `dispatcher_request_duration_seconds` (histogram): time to response head
//! - `dispatcher_inflight_exchanges` (gauge): exchanges currently streaming
//! - `dispatcher_exchange_bytes_total` (counter): response bytes relayed
//! - `dispatcher_malformed_endpoints_total` (counter): endpoints dropped at lookup
//! - `dispatcher_registry_errors_total` (counter): failed registry queries
//! - `dispatcher_upstream_failures_total` (counter): by service, kind
//!
//! The `service` label only carries names that resolved to at least one
//! endpoint. Anything else is recorded as [`UNRESOLVED_SERVICE`], so clients
//! cannot mint new series by requesting made-up services.
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Label used for requests whose service had no endpoint.
pub const UNRESOLVED_SERVICE: &str = "unresolved";

pub fn record_request(service: &str, status: u16, start: Instant) {
    metrics::counter!(
        "dispatcher_requests_total",
        "service" => service.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("dispatcher_request_duration_seconds", "service" => service.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn exchange_started() {
    metrics::gauge!("dispatcher_inflight_exchanges").increment(1.0);
}

pub fn exchange_finished(service: &str, bytes: u64) {
    metrics::gauge!("dispatcher_inflight_exchanges").decrement(1.0);
    metrics::counter!("dispatcher_exchange_bytes_total", "service" => service.to_string()).increment(bytes);
}

pub fn record_malformed_endpoint(service: &str) {
    metrics::counter!("dispatcher_malformed_endpoints_total", "service" => service.to_string()).increment(1);
}

/// Request answered 404 because the service resolved to no endpoint.
pub fn record_unresolved(status: u16, start: Instant) {
    record_request(UNRESOLVED_SERVICE, status, start);
}

pub fn record_registry_error() {
    metrics::counter!("dispatcher_registry_errors_total").increment(1);
}

pub fn record_upstream_failure(service: &str, kind: &'static str) {
    metrics::counter!(
        "dispatcher_upstream_failures_total",
        "service" => service.to_string(),
        "kind" => kind
    )
    .increment(1);
}
