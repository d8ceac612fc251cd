use serde::Serialize;
use tracing::{info, info_span};

use crate::inference::CircuitBreakerState;

/// Operator-relevant event for audit logging.
/// Structured for JSON serialization to enable machine-readable audit trails.
#[derive(Debug, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// The gateway process started.
    SystemStartup {
        /// Component that started.
        component: String,
    },
    /// The gateway process is shutting down.
    SystemShutdown {
        /// Why it is shutting down.
        reason: String,
    },
    /// An operator force-closed a circuit breaker.
    BreakerReset {
        /// Dependency whose breaker was reset.
        dependency: String,
        /// State before the reset.
        previous_state: CircuitBreakerState,
    },
}

/// Logs an audit event to the dedicated audit channel as structured JSON.
/// This uses a specific `target` which can be filtered by the subscriber to redirect to a secure file.
pub fn log_audit(event: &AuditEvent) {
    let span = info_span!(target: "audit", "audit_event");
    let _enter = span.enter();

    let json = serde_json::to_string(event).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"));
    info!(target: "audit", audit_json = %json, "Audit Event");
}
