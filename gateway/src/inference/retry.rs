//! Bounded retry with exponential backoff.
//!
//! [`RetryPolicy::run`] wraps one logical call. A failure the predicate
//! classifies as retryable is retried after
//! `clamp(base_wait * 2^(attempt-1), min_wait, max_wait)`; anything else is
//! returned immediately. The backoff suspension is a Tokio sleep, so other
//! in-flight requests keep running while one call waits.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::infrastructure::metrics;

/// Default maximum number of attempts, including the first
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default base wait for exponential backoff (in milliseconds)
pub const DEFAULT_BASE_WAIT_MS: u64 = 1000;
/// Default lower bound on a single wait (in milliseconds)
pub const DEFAULT_MIN_WAIT_MS: u64 = 1000;
/// Default upper bound on a single wait (in milliseconds)
pub const DEFAULT_MAX_WAIT_MS: u64 = 10_000;

/// Backoff schedule and attempt budget for one logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Wait before the second attempt, doubled for each later attempt
    pub base_wait: Duration,
    /// Lower bound on any single wait
    pub min_wait: Duration,
    /// Upper bound on any single wait
    pub max_wait: Duration,
}

/// State of a call after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryContext {
    /// The attempt that just failed, starting at 1
    pub attempt_number: u32,
    /// How long the executor suspends before the next attempt; `None` once
    /// the failure is terminal
    pub next_wait: Option<Duration>,
    /// The failed attempt's error, rendered for diagnostics
    pub error: String,
}

impl RetryContext {
    /// Returns `true` if no further attempt will be made.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.next_wait.is_none()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryPolicy {
    /// Creates a policy with default values
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_wait: Duration::from_millis(DEFAULT_BASE_WAIT_MS),
            min_wait: Duration::from_millis(DEFAULT_MIN_WAIT_MS),
            max_wait: Duration::from_millis(DEFAULT_MAX_WAIT_MS),
        }
    }

    /// A policy that makes exactly one attempt
    #[must_use]
    pub const fn no_retry() -> Self {
        Self::new().with_max_attempts(1)
    }

    /// Sets the maximum number of attempts
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the base wait
    #[must_use]
    pub const fn with_base_wait(mut self, wait: Duration) -> Self {
        self.base_wait = wait;
        self
    }

    /// Sets the minimum wait
    #[must_use]
    pub const fn with_min_wait(mut self, wait: Duration) -> Self {
        self.min_wait = wait;
        self
    }

    /// Sets the maximum wait
    #[must_use]
    pub const fn with_max_wait(mut self, wait: Duration) -> Self {
        self.max_wait = wait;
        self
    }

    /// Wait after the given failed attempt (1-based).
    #[must_use]
    pub fn wait_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let exponential = self
            .base_wait
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_wait);
        exponential
            .min(self.max_wait)
            .max(self.min_wait.min(self.max_wait))
    }

    /// Builds the context for a failed `attempt`.
    ///
    /// The context is terminal when the error is not retryable or the
    /// attempt budget is spent.
    #[must_use]
    pub fn context_after<E: Display>(
        &self,
        attempt: u32,
        error: &E,
        retryable: bool,
    ) -> RetryContext {
        let next_wait = (retryable && attempt < self.max_attempts.max(1))
            .then(|| self.wait_for_attempt(attempt));
        RetryContext {
            attempt_number: attempt,
            next_wait,
            error: error.to_string(),
        }
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. `op` receives the 1-based attempt number.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the last error once
    /// `max_attempts` attempts have failed.
    pub async fn run<T, E, F, Fut, P>(&self, operation: &str, is_retryable: P, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt = 1;

        loop {
            let error = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let retryable = is_retryable(&error);
            let context = self.context_after(attempt, &error, retryable);

            let Some(wait) = context.next_wait else {
                if retryable {
                    warn!(
                        operation,
                        attempts = context.attempt_number,
                        error = %context.error,
                        "All retry attempts exhausted"
                    );
                } else {
                    debug!(
                        operation,
                        attempt = context.attempt_number,
                        error = %context.error,
                        "Non-retryable failure, giving up"
                    );
                }
                return Err(error);
            };

            let wait_ms: u64 = wait.as_millis().try_into().unwrap_or(u64::MAX);
            warn!(
                operation,
                attempt = context.attempt_number,
                max_attempts = self.max_attempts.max(1),
                wait_ms,
                error = %context.error,
                "Request failed, retrying after backoff"
            );
            metrics::record_retry(operation);

            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}
