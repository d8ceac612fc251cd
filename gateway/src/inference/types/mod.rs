//! Type definitions for upstream completion calls.
//!
//! This module contains the shared types used by the client, the retry
//! executor and the response parser.

pub mod circuit_breaker;
pub mod error;
pub mod message;
pub mod request;
pub mod response;

// Re-export all types for convenience
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerState, CircuitBreakerStats,
    DEFAULT_FAILURE_THRESHOLD, DEFAULT_HALF_OPEN_MAX_CALLS, DEFAULT_RECOVERY_TIMEOUT_SECS,
};
pub use error::ServiceError;
pub use message::{Message, Role};
pub use request::{CallOptions, DEFAULT_TEMPERATURE};
pub use response::{ServiceResponse, Usage};
