//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_decisions_total` (counter): gate outcomes by outcome, reason
//! - `gate_rate_limited_total` (counter): requests rejected with 429
//! - `gate_audit_events_total` (counter): audit events by type
//! - `gate_audit_failures_total` (counter): audit writes that failed or timed out
//! - `gate_limiter_failures_total` (counter): limiter checks that failed open
//! - `gate_validation_failures_total` (counter): DTO rejections by dto
//! - `gate_upstream_requests_total` (counter): forwarded requests by status
//! - `gate_upstream_duration_seconds` (histogram): upstream latency
//! - `gate_limiter_tracked_keys` (gauge): client keys currently tracked

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_decision(outcome: &'static str, reason: &'static str) {
    metrics::counter!("gate_decisions_total", "outcome" => outcome, "reason" => reason).increment(1);
}

pub fn record_rate_limited() {
    metrics::counter!("gate_rate_limited_total").increment(1);
}

pub fn record_audit_event(event_type: &'static str) {
    metrics::counter!("gate_audit_events_total", "event_type" => event_type).increment(1);
}

pub fn record_audit_failure() {
    metrics::counter!("gate_audit_failures_total").increment(1);
}

pub fn record_limiter_failure() {
    metrics::counter!("gate_limiter_failures_total").increment(1);
}

pub fn record_validation_failure(dto: &'static str) {
    metrics::counter!("gate_validation_failures_total", "dto" => dto).increment(1);
}

pub fn record_upstream(status: u16, start: Instant) {
    metrics::counter!("gate_upstream_requests_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("gate_upstream_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_tracked_keys(count: usize) {
    metrics::gauge!("gate_limiter_tracked_keys").set(count as f64);
}
