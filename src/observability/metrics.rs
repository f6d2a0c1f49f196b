//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (connections, outcomes, bytes, latency)
//! - Expose a Prometheus-compatible metrics endpoint when enabled
//!
//! # Metrics
//! - `proxy_connections_total` (counter): accepted client connections
//! - `proxy_active_connections` (gauge): connections currently being relayed
//! - `proxy_requests_total` (counter): finished requests by outcome, status
//! - `proxy_relay_errors_total` (counter): failed requests by error kind
//! - `proxy_relayed_bytes_total` (counter): response bytes sent to clients
//! - `proxy_request_duration_seconds` (histogram): accept-to-close latency
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_connection_opened() {
    metrics::counter!("proxy_connections_total").increment(1);
    metrics::gauge!("proxy_active_connections").increment(1.0);
}

pub fn record_connection_closed() {
    metrics::gauge!("proxy_active_connections").decrement(1.0);
}

/// Record a finished request. `status` is 0 when nothing was answered.
pub fn record_request(outcome: &'static str, status: u16, started: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds").record(started.elapsed().as_secs_f64());
}

/// Count a relay that ended in an error, on either the client or origin side.
pub fn record_error(kind: &'static str) {
    metrics::counter!("proxy_relay_errors_total", "kind" => kind).increment(1);
}

pub fn record_relayed_bytes(bytes: u64) {
    metrics::counter!("proxy_relayed_bytes_total").increment(bytes);
}
