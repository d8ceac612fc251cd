//! Completion Gateway binary: one-shot completion calls or the operator control plane.

use anyhow::Context;
use completion_gateway::inference::{BreakerRegistry, CallOptions, Message, ServiceClient};
use completion_gateway::infrastructure::{
    audit, config::Settings, server, telemetry::TelemetryBuilder,
};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Settings::new().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let metrics = TelemetryBuilder::from_settings(&config.telemetry, env!("CARGO_PKG_VERSION"))
        .init()
        .context("Failed to initialize telemetry")?;

    info!("Completion Gateway Starting...");
    audit::log_audit(&audit::AuditEvent::SystemStartup {
        component: "Gateway".into(),
    });

    let registry = BreakerRegistry::global();
    let client_config = config
        .upstream
        .to_client_config(config.retry.to_policy())?;
    let client = ServiceClient::from_registry(client_config, registry, config.breaker.to_config())
        .context("Failed to build upstream client")?;

    let prompt: Vec<String> = std::env::args().skip(1).collect();
    if !prompt.is_empty() {
        let messages = [Message::user(prompt.join(" "))];
        match client.call(&messages, &CallOptions::new()).await {
            Ok(response) => println!("{}", response.content),
            Err(e) if e.is_circuit_open() => {
                warn!(error = %e, "Upstream degraded");
                println!("{e}");
            }
            Err(e) => {
                error!(error = %e, kind = e.kind(), "Completion call failed");
                return Err(e.into());
            }
        }
        return Ok(());
    }

    let state = server::ControlPlaneState::new(registry, metrics);
    if let Err(e) = server::run_server(&config, state, shutdown_signal()).await {
        error!("Control Plane failed: {:?}", e);
        return Err(e);
    }

    info!("Shutdown signal received, cleaning up...");
    audit::log_audit(&audit::AuditEvent::SystemShutdown {
        reason: "Signal received".into(),
    });

    info!("Completion Gateway Shutdown Complete.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
