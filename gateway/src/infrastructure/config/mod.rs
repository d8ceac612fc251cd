//! Configuration management for the gateway.
//!
//! Settings are layered: built-in defaults, then an optional TOML file
//! (`gateway.toml`, or the path in `GATEWAY_CONFIG`), then environment
//! variables such as `GATEWAY__BREAKER__FAILURE_THRESHOLD`.
//!
//! # Example
//!
//! ```no_run
//! use completion_gateway::infrastructure::config::Settings;
//!
//! let settings = Settings::new().expect("Failed to load configuration");
//! settings.validate().expect("Invalid configuration");
//! ```

pub mod resilience;
pub mod server;
pub mod telemetry;
pub mod upstream;

pub use resilience::{BreakerSettings, RetrySettings};
pub use server::ServerSettings;
pub use telemetry::TelemetrySettings;
pub use upstream::UpstreamSettings;

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

/// Environment variable naming an alternative settings file.
pub const CONFIG_PATH_ENV: &str = "GATEWAY_CONFIG";
/// Settings file read from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "gateway.toml";

/// Top-level configuration for the gateway.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Control plane server settings.
    pub server: ServerSettings,
    /// Telemetry settings.
    pub telemetry: TelemetrySettings,
    /// Upstream completion service settings.
    #[serde(default)]
    pub upstream: UpstreamSettings,
    /// Circuit breaker settings.
    #[serde(default)]
    pub breaker: BreakerSettings,
    /// Retry settings.
    #[serde(default)]
    pub retry: RetrySettings,
}

impl Settings {
    /// Loads settings from defaults, the settings file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be built or deserialized.
    pub fn new() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);
        Self::load(Some(&path), Environment::with_prefix("GATEWAY").separator("__"))
    }

    /// Loads settings from an explicit file and environment source.
    ///
    /// A missing file is ignored; a malformed one is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be built or deserialized.
    pub fn load(file: Option<&Path>, environment: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 9090)?
            .set_default("telemetry.service_name", "completion-gateway")?
            .set_default("telemetry.sampling_ratio", 1.0)?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        builder.add_source(environment).build()?.try_deserialize()
    }

    /// Rejects values the breaker and retry executor cannot honor.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Message`] naming the first invalid option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Message(msg.to_string()));

        if self.breaker.failure_threshold < 1 {
            return invalid("breaker.failure_threshold must be at least 1");
        }
        if self.breaker.half_open_max_calls < 1 {
            return invalid("breaker.half_open_max_calls must be at least 1");
        }
        if self.retry.max_retries < 1 {
            return invalid("retry.max_retries must be at least 1");
        }
        if self.retry.min_wait_ms > self.retry.max_wait_ms {
            return invalid("retry.min_wait_ms must not exceed retry.max_wait_ms");
        }
        if self.upstream.request_timeout_secs == 0 {
            return invalid("upstream.request_timeout_secs must be greater than 0");
        }
        Ok(())
    }
}

/// Helper for strong typing addresses
pub struct BindAddress(pub String, pub u16);

impl BindAddress {
    /// Converts the bind address to a `SocketAddr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the IP address string cannot be parsed.
    pub fn to_socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        let ip = self
            .0
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid IP address '{}': {e}", self.0))?;
        Ok(std::net::SocketAddr::new(ip, self.1))
    }
}

impl From<&ServerSettings> for BindAddress {
    fn from(server: &ServerSettings) -> Self {
        Self(server.host.clone(), server.port)
    }
}
