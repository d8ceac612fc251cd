//! Circuit breaker and retry configuration.
//!
//! Field names follow the operator-facing option names
//! (`failure_threshold`, `recovery_timeout_seconds`, ...).

use std::time::Duration;

use serde::Deserialize;

use crate::inference::retry::{
    DEFAULT_BASE_WAIT_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_WAIT_MS, DEFAULT_MIN_WAIT_MS,
};
use crate::inference::types::{
    DEFAULT_FAILURE_THRESHOLD, DEFAULT_HALF_OPEN_MAX_CALLS, DEFAULT_RECOVERY_TIMEOUT_SECS,
};
use crate::inference::{CircuitBreakerConfig, RetryPolicy};

/// Circuit breaker settings.
#[derive(Debug, Deserialize, Clone)]
pub struct BreakerSettings {
    /// Failures before the circuit opens (default: 5)
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Seconds after the last failure before a probe is admitted (default: 60)
    #[serde(default = "default_recovery_timeout_seconds")]
    pub recovery_timeout_seconds: u64,
    /// Half-open successes needed to close (default: 3)
    #[serde(default = "default_half_open_max_calls")]
    pub half_open_max_calls: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout_seconds: default_recovery_timeout_seconds(),
            half_open_max_calls: default_half_open_max_calls(),
        }
    }
}

impl BreakerSettings {
    /// Converts to the breaker's runtime configuration.
    #[must_use]
    pub fn to_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::new()
            .with_failure_threshold(self.failure_threshold)
            .with_recovery_timeout(Duration::from_secs(self.recovery_timeout_seconds))
            .with_half_open_max_calls(self.half_open_max_calls)
    }
}

/// Retry settings.
#[derive(Debug, Deserialize, Clone)]
pub struct RetrySettings {
    /// Maximum attempts per call, including the first (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff in milliseconds (default: 1000)
    #[serde(default = "default_base_wait_ms")]
    pub base_wait_ms: u64,
    /// Minimum backoff in milliseconds (default: 1000)
    #[serde(default = "default_min_wait_ms")]
    pub min_wait_ms: u64,
    /// Maximum backoff in milliseconds (default: 10000)
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_wait_ms: default_base_wait_ms(),
            min_wait_ms: default_min_wait_ms(),
            max_wait_ms: default_max_wait_ms(),
        }
    }
}

impl RetrySettings {
    /// Converts to the retry executor's policy.
    #[must_use]
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_attempts(self.max_retries)
            .with_base_wait(Duration::from_millis(self.base_wait_ms))
            .with_min_wait(Duration::from_millis(self.min_wait_ms))
            .with_max_wait(Duration::from_millis(self.max_wait_ms))
    }
}

fn default_failure_threshold() -> u32 {
    DEFAULT_FAILURE_THRESHOLD
}

fn default_recovery_timeout_seconds() -> u64 {
    DEFAULT_RECOVERY_TIMEOUT_SECS
}

fn default_half_open_max_calls() -> u32 {
    DEFAULT_HALF_OPEN_MAX_CALLS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_base_wait_ms() -> u64 {
    DEFAULT_BASE_WAIT_MS
}

fn default_min_wait_ms() -> u64 {
    DEFAULT_MIN_WAIT_MS
}

fn default_max_wait_ms() -> u64 {
    DEFAULT_MAX_WAIT_MS
}
