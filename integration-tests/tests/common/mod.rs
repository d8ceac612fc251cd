//! Shared test utilities for integration tests.
//!
//! Provides a mock upstream completion service and helpers for building
//! clients that share breakers through a registry.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use completion_gateway::inference::{
    BreakerRegistry, CircuitBreakerConfig, RetryPolicy, ServiceClient, ServiceClientConfig,
};
use reqwest::Url;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Retry policy with millisecond backoff so tests stay fast.
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new()
        .with_max_attempts(max_attempts)
        .with_base_wait(Duration::from_millis(5))
        .with_min_wait(Duration::from_millis(5))
        .with_max_wait(Duration::from_millis(10))
}

/// Builds a client for `dependency` whose breaker lives in `registry`.
pub fn client_for(
    server: &MockServer,
    dependency: &str,
    registry: &BreakerRegistry,
    breaker: CircuitBreakerConfig,
    retry: RetryPolicy,
) -> Result<ServiceClient> {
    let base_url = Url::parse(&format!("{}/", server.uri()))?;
    let config = ServiceClientConfig::new(dependency, base_url)
        .with_default_model("gpt-4")
        .with_retry(retry);
    ServiceClient::from_registry(config, registry, breaker)
}

/// Same as [`client_for`], wrapped for sharing across tasks.
pub fn shared_client(
    server: &MockServer,
    dependency: &str,
    registry: &BreakerRegistry,
    breaker: CircuitBreakerConfig,
    retry: RetryPolicy,
) -> Result<Arc<ServiceClient>> {
    client_for(server, dependency, registry, breaker, retry).map(Arc::new)
}

/// A well-formed completion envelope carrying `content`.
pub fn completion_body(content: &str) -> Value {
    json!({
        "model": "gpt-4",
        "choices": [{
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 4, "completion_tokens": 8, "total_tokens": 12}
    })
}

/// Mounts an upstream that always answers with `content`.
pub async fn mount_reply(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(content)))
        .mount(server)
        .await;
}

/// Mounts an upstream that always fails with `status`.
pub async fn mount_failure(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Number of requests the mock upstream has received.
pub async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map_or(0, |requests| requests.len())
}
