//! Operator control plane.
//!
//! Liveness and readiness probes, breaker inspection and reset, and the
//! Prometheus scrape endpoint.

use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

use crate::inference::{BreakerRegistry, CircuitBreakerState, CircuitBreakerStats};
use crate::infrastructure::audit::{log_audit, AuditEvent};
use crate::infrastructure::config::{BindAddress, Settings};

/// Shared state for control plane handlers.
#[derive(Clone)]
pub struct ControlPlaneState {
    registry: &'static BreakerRegistry,
    metrics: Option<PrometheusHandle>,
}

impl ControlPlaneState {
    /// Creates state over a breaker registry, usually [`BreakerRegistry::global`].
    #[must_use]
    pub fn new(registry: &'static BreakerRegistry, metrics: Option<PrometheusHandle>) -> Self {
        Self { registry, metrics }
    }
}

#[derive(Debug, Serialize)]
struct Readiness {
    ready: bool,
    open_breakers: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ResetOutcome {
    dependency: String,
    previous_state: CircuitBreakerState,
    state: CircuitBreakerState,
}

async fn health_check() -> &'static str {
    "OK"
}

async fn readiness(State(state): State<ControlPlaneState>) -> impl IntoResponse {
    let open_breakers: Vec<String> = state
        .registry
        .snapshot()
        .into_iter()
        .filter(|(_, stats)| stats.state == CircuitBreakerState::Open)
        .map(|(name, _)| name)
        .collect();

    let status = if open_breakers.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let ready = open_breakers.is_empty();
    (status, Json(Readiness { ready, open_breakers }))
}

async fn list_breakers(
    State(state): State<ControlPlaneState>,
) -> Json<BTreeMap<String, CircuitBreakerStats>> {
    Json(state.registry.snapshot())
}

async fn reset_breaker(
    State(state): State<ControlPlaneState>,
    Path(name): Path<String>,
) -> Result<Json<ResetOutcome>, StatusCode> {
    let breaker = state.registry.get(&name).ok_or(StatusCode::NOT_FOUND)?;

    let previous_state = breaker.state();
    breaker.reset();
    log_audit(&AuditEvent::BreakerReset {
        dependency: name.clone(),
        previous_state,
    });

    Ok(Json(ResetOutcome {
        dependency: name,
        previous_state,
        state: breaker.state(),
    }))
}

async fn render_metrics(State(state): State<ControlPlaneState>) -> impl IntoResponse {
    match state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::NOT_FOUND,
            "Metrics are disabled".to_string(),
        ),
    }
}

/// Builds the control plane router.
pub fn router(state: ControlPlaneState) -> Router {
    Router::new()
        .route("/health/live", get(health_check))
        .route("/health/ready", get(readiness))
        .route("/breakers", get(list_breakers))
        .route("/breakers/{name}/reset", post(reset_breaker))
        .route("/metrics", get(render_metrics))
        .with_state(state)
}

/// Runs the control plane HTTP server until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server fails to start or encounters an error while running.
pub async fn run_server(
    config: &Settings,
    state: ControlPlaneState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr: SocketAddr = BindAddress::from(&config.server).to_socket_addr()?;

    tracing::info!(%addr, "Control Plane listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
