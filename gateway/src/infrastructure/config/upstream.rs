//! Upstream completion service configuration.
//!
//! This module defines where the gateway sends calls and how it
//! authenticates.

use std::time::Duration;

use anyhow::Context;
use reqwest::Url;
use secrecy::SecretString;
use serde::Deserialize;

use crate::inference::client::{DEFAULT_MODEL, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::inference::{RetryPolicy, ServiceClientConfig};

/// Upstream completion service settings.
#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamSettings {
    /// Dependency name; one circuit breaker exists per name (default: "completion")
    #[serde(default = "default_dependency")]
    pub dependency: String,
    /// Base URL of the completion API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token for the API.
    pub api_key: Option<SecretString>,
    /// Model used when a call does not name one.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            dependency: default_dependency(),
            base_url: default_base_url(),
            api_key: None,
            default_model: default_model(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl UpstreamSettings {
    /// Builds the client configuration with the given retry policy.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL.
    pub fn to_client_config(&self, retry: RetryPolicy) -> anyhow::Result<ServiceClientConfig> {
        let mut base = self.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).with_context(|| format!("Invalid upstream base URL '{base}'"))?;

        let mut config = ServiceClientConfig::new(self.dependency.clone(), base_url)
            .with_default_model(self.default_model.clone())
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_retry(retry);
        if let Some(key) = &self.api_key {
            config = config.with_api_key(key.clone());
        }
        Ok(config)
    }
}

fn default_dependency() -> String {
    "completion".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1/".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() -> anyhow::Result<()> {
        let settings = UpstreamSettings {
            base_url: "http://localhost:8080/v1".to_string(),
            ..UpstreamSettings::default()
        };
        let config = settings.to_client_config(RetryPolicy::default())?;
        assert_eq!(config.base_url.as_str(), "http://localhost:8080/v1/");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        Ok(())
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let settings = UpstreamSettings {
            base_url: "not a url".to_string(),
            ..UpstreamSettings::default()
        };
        assert!(settings.to_client_config(RetryPolicy::default()).is_err());
    }
}
