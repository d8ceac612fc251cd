/// Audit logging for operator actions.
pub mod audit;
/// Configuration management for the gateway.
pub mod config;
/// Metric names and recording helpers.
pub mod metrics;
/// HTTP server and control plane.
pub mod server;
/// Telemetry setup for logging, tracing, and metrics.
pub mod telemetry;
