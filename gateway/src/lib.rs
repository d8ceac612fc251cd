//! Completion Gateway - resilient access to an unreliable completion service.
//!
//! This crate wraps a rate-limited, occasionally failing text-completion
//! API behind a process-wide circuit breaker, bounded exponential-backoff
//! retries and defensive parsing of structured replies, so that an outage
//! degrades the calling workflow instead of cascading through it.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Completion client, circuit breaker, retry executor and response parser.
pub mod inference;
/// Infrastructure components (config, server, telemetry).
pub mod infrastructure;
