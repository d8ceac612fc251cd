//! Metric hooks emitted by the gateway.
//!
//! All hooks go through the `metrics` facade. Without an installed recorder
//! they are no-ops, so library users and tests pay nothing for them.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): outbound requests by dependency
//! - `gateway_request_duration_seconds` (histogram): latency of successful calls
//! - `gateway_request_errors_total` (counter): failures by dependency and kind
//! - `gateway_circuit_rejections_total` (counter): calls refused by an open breaker
//! - `gateway_circuit_state` (gauge): 0 closed, 1 half-open, 2 open
//! - `gateway_retries_total` (counter): backoff suspensions by operation
//! - `gateway_parse_fallbacks_total` (counter): call sites that used their fallback

use std::time::Duration;

use crate::inference::types::CircuitBreakerState;

/// Records one outbound request attempt.
pub fn record_request(dependency: &str) {
    metrics::counter!("gateway_requests_total", "dependency" => dependency.to_string())
        .increment(1);
}

/// Records the latency of a successful request.
pub fn record_latency(dependency: &str, elapsed: Duration) {
    metrics::histogram!(
        "gateway_request_duration_seconds",
        "dependency" => dependency.to_string()
    )
    .record(elapsed.as_secs_f64());
}

/// Records a classified request failure.
pub fn record_error(dependency: &str, kind: &'static str) {
    metrics::counter!(
        "gateway_request_errors_total",
        "dependency" => dependency.to_string(),
        "kind" => kind
    )
    .increment(1);
}

/// Records a call refused locally because the breaker is open.
pub fn record_rejection(dependency: &str) {
    metrics::counter!(
        "gateway_circuit_rejections_total",
        "dependency" => dependency.to_string()
    )
    .increment(1);
}

/// Publishes the current breaker state.
pub fn record_circuit_state(dependency: &str, state: CircuitBreakerState) {
    let value = match state {
        CircuitBreakerState::Closed => 0.0,
        CircuitBreakerState::HalfOpen => 1.0,
        CircuitBreakerState::Open => 2.0,
    };
    metrics::gauge!("gateway_circuit_state", "dependency" => dependency.to_string()).set(value);
}

/// Records a retry about to be scheduled.
pub fn record_retry(operation: &str) {
    metrics::counter!("gateway_retries_total", "operation" => operation.to_string()).increment(1);
}

/// Records a structured-extraction site falling back to its default.
pub fn record_parse_fallback(site: &str) {
    metrics::counter!("gateway_parse_fallbacks_total", "site" => site.to_string()).increment(1);
}
