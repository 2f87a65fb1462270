//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, service
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_admission_rejected_total` (counter): 429s from the gate
//! - `gateway_request_rate` (gauge): last sampled per-interval request count
//! - `gateway_overload_total` (counter): samples over the threshold
//! - `gateway_circuit_transitions_total` (counter): opens/closes per address
//! - `gateway_health_probes_total` (counter): probe outcomes
//! - `gateway_registered_services_total` (counter): registrations
//! - `gateway_transactions_total` (counter): outcomes by kind
//!
//! Updates are cheap atomic operations; exposition is the gateway's own
//! `GET /metrics` route rendering the Prometheus handle.

use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return the render handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Record a completed gateway request.
pub fn record_request(method: &str, status: u16, service: &str, start_time: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "service" => service.to_string()
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "service" => service.to_string()
    )
    .record(start_time.elapsed().as_secs_f64());
}

pub fn record_admission_rejected() {
    counter!("gateway_admission_rejected_total").increment(1);
}

pub fn record_request_rate_sample(sampled: u64) {
    gauge!("gateway_request_rate").set(sampled as f64);
}

pub fn record_overload() {
    counter!("gateway_overload_total").increment(1);
}

pub fn record_circuit_transition(address: &str, state: &str) {
    counter!(
        "gateway_circuit_transitions_total",
        "address" => address.to_string(),
        "state" => state.to_string()
    )
    .increment(1);
}

pub fn record_probe(service: &str, address: &str, healthy: bool) {
    counter!(
        "gateway_health_probes_total",
        "service" => service.to_string(),
        "address" => address.to_string(),
        "outcome" => if healthy { "success" } else { "failure" }
    )
    .increment(1);
}

pub fn record_service_registered(service: &str) {
    counter!(
        "gateway_registered_services_total",
        "service" => service.to_string()
    )
    .increment(1);
}

pub fn record_transaction(outcome: &'static str) {
    counter!("gateway_transactions_total", "outcome" => outcome).increment(1);
}
