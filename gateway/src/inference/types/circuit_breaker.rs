//! Circuit breaker guarding the upstream completion service.
//!
//! # State Transitions
//! ```text
//! Closed   → Open:     failure_count reaches failure_threshold
//! Open     → HalfOpen: first is_open() check once recovery_timeout has
//!                      elapsed since the last failure
//! HalfOpen → Closed:   half_open_max_calls consecutive successes
//! HalfOpen → Open:     any single failure
//! ```
//!
//! There is no background timer. The `Open → HalfOpen` move happens lazily
//! inside [`CircuitBreaker::is_open`]. All reads that depend on state and all
//! mutations take the same mutex, so concurrent callers only ever observe
//! whole transitions.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::infrastructure::metrics;

/// Default failure threshold before circuit breaker opens
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
/// Default recovery timeout in seconds
pub const DEFAULT_RECOVERY_TIMEOUT_SECS: u64 = 60;
/// Default number of consecutive half-open successes needed to close
pub const DEFAULT_HALF_OPEN_MAX_CALLS: u32 = 3;

/// Configuration for circuit breaker behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Number of failures before opening the circuit
    pub failure_threshold: u32,
    /// Time since the last failure before a probe is admitted
    pub recovery_timeout: Duration,
    /// Consecutive successes in half-open state needed to close
    pub half_open_max_calls: u32,
}

impl CircuitBreakerConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            recovery_timeout: Duration::from_secs(DEFAULT_RECOVERY_TIMEOUT_SECS),
            half_open_max_calls: DEFAULT_HALF_OPEN_MAX_CALLS,
        }
    }

    /// Sets the failure threshold.
    #[must_use]
    pub const fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets the recovery timeout.
    #[must_use]
    pub const fn with_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }

    /// Sets the number of half-open successes needed to close.
    #[must_use]
    pub const fn with_half_open_max_calls(mut self, max_calls: u32) -> Self {
        self.half_open_max_calls = max_calls;
        self
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitBreakerState {
    /// Circuit is closed, requests flow through normally
    #[default]
    Closed,
    /// Circuit is open, requests fail fast
    Open,
    /// Circuit is testing recovery with limited traffic
    HalfOpen,
}

impl fmt::Display for CircuitBreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Point-in-time view of a breaker for dashboards and health checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CircuitBreakerStats {
    /// Current state of the circuit
    pub state: CircuitBreakerState,
    /// Failures since the last reset to zero
    pub failure_count: u32,
    /// Consecutive successes while half-open
    pub success_count_in_half_open: u32,
    /// Wall-clock time of the most recent failure
    pub last_failure_time: Option<DateTime<Utc>>,
    /// Total number of successes
    pub total_successes: u64,
    /// Total number of failures
    pub total_failures: u64,
}

#[derive(Debug, Default)]
struct BreakerInner {
    state: CircuitBreakerState,
    failure_count: u32,
    success_count_in_half_open: u32,
    last_failure_at: Option<Instant>,
    last_failure_time: Option<DateTime<Utc>>,
    total_successes: u64,
    total_failures: u64,
}

/// A circuit breaker shared by every client of one downstream dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Creates a closed breaker for the named dependency.
    ///
    /// Thresholds below one are raised to one.
    #[must_use]
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let config = CircuitBreakerConfig {
            failure_threshold: config.failure_threshold.max(1),
            half_open_max_calls: config.half_open_max_calls.max(1),
            ..config
        };
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner::default()),
        }
    }

    /// Name of the protected dependency.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective configuration.
    #[must_use]
    pub const fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Hint handed to callers rejected while the circuit is open.
    #[must_use]
    pub const fn recovery_timeout(&self) -> Duration {
        self.config.recovery_timeout
    }

    /// Returns `true` if calls must be rejected without contacting the dependency.
    ///
    /// When open and `recovery_timeout` has elapsed since the last failure,
    /// this moves the breaker to half-open and admits the call.
    pub fn is_open(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != CircuitBreakerState::Open {
            return false;
        }

        match inner.last_failure_at {
            Some(at) if at.elapsed() < self.config.recovery_timeout => true,
            _ => {
                inner.success_count_in_half_open = 0;
                self.transition(&mut inner, CircuitBreakerState::HalfOpen);
                false
            }
        }
    }

    /// Records a call that completed successfully.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.total_successes += 1;

        match inner.state {
            CircuitBreakerState::Closed => inner.failure_count = 0,
            CircuitBreakerState::HalfOpen => {
                inner.success_count_in_half_open += 1;
                if inner.success_count_in_half_open >= self.config.half_open_max_calls {
                    inner.failure_count = 0;
                    inner.success_count_in_half_open = 0;
                    self.transition(&mut inner, CircuitBreakerState::Closed);
                }
            }
            // Late completion of a call dispatched before the circuit opened
            CircuitBreakerState::Open => {}
        }
    }

    /// Records a call that failed in a way that implicates the dependency.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.total_failures += 1;
        inner.last_failure_at = Some(Instant::now());
        inner.last_failure_time = Some(Utc::now());

        match inner.state {
            CircuitBreakerState::HalfOpen => {
                inner.success_count_in_half_open = 0;
                self.transition(&mut inner, CircuitBreakerState::Open);
            }
            CircuitBreakerState::Closed
                if inner.failure_count >= self.config.failure_threshold =>
            {
                self.transition(&mut inner, CircuitBreakerState::Open);
            }
            // Already open: the stamp above pushes back the earliest probe
            _ => {}
        }
    }

    /// Returns a snapshot of the breaker.
    #[must_use]
    pub fn get_state(&self) -> CircuitBreakerStats {
        let inner = self.inner.lock();
        CircuitBreakerStats {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count_in_half_open: inner.success_count_in_half_open,
            last_failure_time: inner.last_failure_time,
            total_successes: inner.total_successes,
            total_failures: inner.total_failures,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> CircuitBreakerState {
        self.inner.lock().state
    }

    /// Forces the breaker closed and clears all counters.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        let previous = inner.state;
        *inner = BreakerInner::default();
        info!(
            dependency = %self.name,
            previous_state = %previous,
            "Circuit breaker reset"
        );
        metrics::record_circuit_state(&self.name, CircuitBreakerState::Closed);
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitBreakerState) {
        let from = inner.state;
        inner.state = to;
        match to {
            CircuitBreakerState::Open => warn!(
                dependency = %self.name,
                from = %from,
                failure_count = inner.failure_count,
                recovery_timeout_secs = self.config.recovery_timeout.as_secs(),
                "Circuit breaker opened"
            ),
            CircuitBreakerState::HalfOpen => info!(
                dependency = %self.name,
                "Circuit breaker half-open, admitting probe calls"
            ),
            CircuitBreakerState::Closed => info!(
                dependency = %self.name,
                from = %from,
                "Circuit breaker closed"
            ),
        }
        metrics::record_circuit_state(&self.name, to);
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new("default", CircuitBreakerConfig::default())
    }
}
