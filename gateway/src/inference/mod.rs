/// Process-wide circuit breaker registry.
pub mod breakers;
/// HTTP client and request lifecycle.
pub mod client;
/// Structured response extraction.
pub mod parser;
/// Provider abstraction used by call sites.
pub mod provider;
/// Retry executor with exponential backoff.
pub mod retry;
/// Shared request, response, error and breaker types.
pub mod types;

pub use breakers::BreakerRegistry;
pub use client::{ServiceClient, ServiceClientConfig};
pub use parser::{complete_structured, parse_or, parse_or_else, parse_structured, strip_fences};
pub use provider::CompletionProvider;
pub use retry::{RetryContext, RetryPolicy};
pub use types::*;
