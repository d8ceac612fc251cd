//! Request lifecycle for the upstream completion service.
//!
//! ```text
//! START → BREAKER_CHECK → REJECTED (CircuitOpen, no network)
//!                       → DISPATCH → NETWORK_ERROR | HTTP_ERROR | SUCCESS
//! ```
//!
//! The whole lifecycle runs once per attempt inside [`RetryPolicy::run`], so
//! a failed half-open probe reopens the breaker before the next retry is
//! even considered. Breaker updates happen only after the upstream call has
//! resolved; dropping the future mid-flight leaves the breaker untouched.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};

use crate::inference::breakers::BreakerRegistry;
use crate::inference::client::mapping::{
    create_request, map_response, CompletionRequestBody, CompletionResponseBody,
};
use crate::inference::provider::CompletionProvider;
use crate::inference::retry::RetryPolicy;
use crate::inference::types::{
    CallOptions, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, Message,
    ServiceError, ServiceResponse,
};
use crate::infrastructure::metrics;

/// Default model used when a call does not name one
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration for a [`ServiceClient`]
#[derive(Debug, Clone)]
pub struct ServiceClientConfig {
    /// Name of the downstream dependency; selects the shared breaker
    pub dependency: String,
    /// Base URL of the completion API, e.g. `https://api.openai.com/v1/`
    pub base_url: Url,
    /// Bearer token, if the upstream requires one
    pub api_key: Option<SecretString>,
    /// Model used when [`CallOptions::model`] is `None`
    pub default_model: String,
    /// Deadline for one HTTP exchange
    pub request_timeout: Duration,
    /// Retry schedule wrapped around each call
    pub retry: RetryPolicy,
}

impl ServiceClientConfig {
    /// Creates a config with default model, timeout and retry policy
    #[must_use]
    pub fn new(dependency: impl Into<String>, base_url: Url) -> Self {
        Self {
            dependency: dependency.into(),
            base_url,
            api_key: None,
            default_model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }

    /// Sets the API key
    #[must_use]
    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Sets the default model
    #[must_use]
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Sets the request timeout
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Client for the upstream completion service.
///
/// Owns one HTTP session for its lifetime. The circuit breaker is shared
/// with every other client of the same dependency and outlives this client.
pub struct ServiceClient {
    http: Client,
    endpoint: Url,
    config: ServiceClientConfig,
    breaker: Arc<CircuitBreaker>,
    operation: String,
}

impl ServiceClient {
    /// Creates a client that reports to the given breaker.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL cannot be derived from the base
    /// URL or the HTTP session cannot be built.
    pub fn new(config: ServiceClientConfig, breaker: Arc<CircuitBreaker>) -> anyhow::Result<Self> {
        let endpoint = config
            .base_url
            .join("chat/completions")
            .with_context(|| format!("Invalid base URL '{}'", config.base_url))?;

        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let operation = format!("{}.call", config.dependency);

        Ok(Self {
            http,
            endpoint,
            config,
            breaker,
            operation,
        })
    }

    /// Creates a client whose breaker comes from `registry`, registering one
    /// with `breaker_config` if the dependency has none yet.
    ///
    /// # Errors
    ///
    /// See [`ServiceClient::new`].
    pub fn from_registry(
        config: ServiceClientConfig,
        registry: &BreakerRegistry,
        breaker_config: CircuitBreakerConfig,
    ) -> anyhow::Result<Self> {
        let breaker = registry.get_or_create(&config.dependency, breaker_config);
        Self::new(config, breaker)
    }

    /// The client's configuration
    #[must_use]
    pub fn config(&self) -> &ServiceClientConfig {
        &self.config
    }

    /// The shared breaker guarding this client's dependency
    #[must_use]
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Breaker snapshot for dashboards and health checks
    #[must_use]
    pub fn get_breaker_state(&self) -> CircuitBreakerStats {
        self.breaker.get_state()
    }

    /// Forces the shared breaker closed. Operator and test use only.
    pub fn reset_breaker(&self) {
        self.breaker.reset();
    }

    /// Sends the conversation to the upstream and returns its reply.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::CircuitOpen`] without contacting the network
    /// while the breaker is open, a non-retryable error as soon as it
    /// occurs, or the last retryable error once the retry budget is spent.
    #[instrument(skip_all, fields(dependency = %self.config.dependency))]
    pub async fn call(
        &self,
        messages: &[Message],
        options: &CallOptions,
    ) -> Result<ServiceResponse, ServiceError> {
        let model = options
            .model
            .as_deref()
            .unwrap_or(&self.config.default_model);
        let body = create_request(model, messages, options);

        self.config
            .retry
            .run(&self.operation, ServiceError::is_retryable, |attempt| {
                self.attempt(&body, attempt)
            })
            .await
    }

    async fn attempt(
        &self,
        body: &CompletionRequestBody<'_>,
        attempt: u32,
    ) -> Result<ServiceResponse, ServiceError> {
        let dependency = self.config.dependency.as_str();

        if self.breaker.is_open() {
            metrics::record_rejection(dependency);
            let retry_after = self.breaker.recovery_timeout();
            debug!(
                dependency,
                attempt,
                retry_after_secs = retry_after.as_secs(),
                "Circuit open, rejecting call"
            );
            return Err(ServiceError::CircuitOpen { retry_after });
        }

        metrics::record_request(dependency);
        let started = Instant::now();

        let outcome = match self.build_api_request(body).send().await {
            Ok(res) => map_api_response(res, body.model).await,
            Err(e) => Err(classify_transport_error(&e)),
        };

        match &outcome {
            Ok(response) => {
                self.breaker.record_success();
                metrics::record_latency(dependency, started.elapsed());
                debug!(
                    dependency,
                    attempt,
                    model = %response.model,
                    elapsed_ms = started.elapsed().as_millis(),
                    "Completion call succeeded"
                );
            }
            Err(error) => {
                match error {
                    // The dependency answered; only the payload was unusable
                    ServiceError::Parsing { .. } => self.breaker.record_success(),
                    e if e.counts_against_breaker() => self.breaker.record_failure(),
                    _ => {}
                }
                metrics::record_error(dependency, error.kind());
                debug!(dependency, attempt, error = %error, "Completion call failed");
            }
        }

        outcome
    }

    fn build_api_request(&self, body: &CompletionRequestBody<'_>) -> reqwest::RequestBuilder {
        let request = self
            .http
            .post(self.endpoint.clone())
            .header("Content-Type", "application/json")
            .json(body);

        match &self.config.api_key {
            Some(key) => request.bearer_auth(key.expose_secret()),
            None => request,
        }
    }
}

#[async_trait]
impl CompletionProvider for ServiceClient {
    async fn call(
        &self,
        messages: &[Message],
        options: &CallOptions,
    ) -> Result<ServiceResponse, ServiceError> {
        ServiceClient::call(self, messages, options).await
    }
}

async fn map_api_response(
    res: reqwest::Response,
    requested_model: &str,
) -> Result<ServiceResponse, ServiceError> {
    let status = res.status();

    if status.is_success() {
        let text = res.text().await.map_err(|e| classify_transport_error(&e))?;
        let body: CompletionResponseBody = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(e) => {
                return Err(ServiceError::Parsing {
                    raw_content: text,
                    reason: format!("Invalid completion envelope: {e}"),
                })
            }
        };
        return map_response(body, requested_model).map_err(|reason| ServiceError::Parsing {
            raw_content: text,
            reason,
        });
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(ServiceError::Authentication(format!("HTTP {status}")))
        }
        StatusCode::TOO_MANY_REQUESTS => Err(ServiceError::RateLimit {
            retry_after: parse_retry_after(res.headers()),
        }),
        s if s.is_server_error() => {
            let text = res.text().await.unwrap_or_default();
            Err(ServiceError::Connection {
                message: format!("HTTP {status}: {text}"),
                status: Some(s.as_u16()),
            })
        }
        _ => {
            let text = res.text().await.unwrap_or_default();
            Err(ServiceError::InvalidRequest {
                status: status.as_u16(),
                message: text,
            })
        }
    }
}

fn classify_transport_error(error: &reqwest::Error) -> ServiceError {
    if error.is_timeout() {
        ServiceError::Timeout(error.to_string())
    } else if error.is_connect() {
        ServiceError::connection(format!("Connect failed: {error}"))
    } else {
        ServiceError::connection(error.to_string())
    }
}

/// Reads a `Retry-After` header given in (possibly fractional) seconds.
///
/// The HTTP-date form is not used by completion providers and yields `None`.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let secs: f64 = value.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}
