//! Error types for upstream completion calls.
//!
//! Every failure a caller can observe from the gateway is one variant of
//! [`ServiceError`]. Callers match on the variant, never on message text.

use std::time::Duration;

/// Errors that can occur while calling the upstream completion service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Connection could not be established, was reset, or the upstream
    /// answered with a 5xx status.
    #[error("Connection Error: {message}")]
    Connection {
        /// Transport or upstream detail
        message: String,
        /// HTTP status when the upstream answered with a server error
        status: Option<u16>,
    },
    /// The request did not complete within the configured timeout
    #[error("Timeout Error: {0}")]
    Timeout(String),
    /// The upstream is rate limiting this client
    #[error("Rate Limit Exceeded")]
    RateLimit {
        /// Provider-supplied hint for when to try again
        retry_after: Option<Duration>,
    },
    /// Credentials were rejected by the upstream
    #[error("Authentication Error: {0}")]
    Authentication(String),
    /// The circuit breaker is open; the upstream was not contacted
    #[error("Service temporarily degraded, retry after {} seconds", retry_after.as_secs())]
    CircuitOpen {
        /// How long until the breaker will admit a probe
        retry_after: Duration,
    },
    /// The upstream rejected the request itself (4xx other than auth/rate limit)
    #[error("Invalid Request (HTTP {status}): {message}")]
    InvalidRequest {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },
    /// Response content could not be turned into the expected structure
    #[error("Parsing Error: {reason}")]
    Parsing {
        /// The content exactly as received
        raw_content: String,
        /// Why parsing failed
        reason: String,
    },
}

impl ServiceError {
    /// Builds a connection error without an HTTP status.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            status: None,
        }
    }

    /// Returns `true` if this error is transient and retry may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::Timeout(_) | Self::RateLimit { .. } => true,
            Self::Authentication(_)
            | Self::CircuitOpen { .. }
            | Self::InvalidRequest { .. }
            | Self::Parsing { .. } => false,
        }
    }

    /// Returns `true` if this error is evidence that the dependency is unhealthy.
    #[must_use]
    pub fn counts_against_breaker(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Timeout(_) | Self::RateLimit { .. }
        )
    }

    /// Returns `true` if this error is a circuit breaker rejection.
    #[must_use]
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// How long the caller should wait before trying again, if known.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit { retry_after } => *retry_after,
            Self::CircuitOpen { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// Stable, low-cardinality name used as a metric label.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::Timeout(_) => "timeout",
            Self::RateLimit { .. } => "rate_limit",
            Self::Authentication(_) => "authentication",
            Self::CircuitOpen { .. } => "circuit_open",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::Parsing { .. } => "parsing",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsing() -> ServiceError {
        ServiceError::Parsing {
            raw_content: "oops".to_string(),
            reason: "expected value".to_string(),
        }
    }

    #[test]
    fn test_error_is_retryable() {
        assert!(ServiceError::connection("refused").is_retryable());
        assert!(ServiceError::Timeout("read".to_string()).is_retryable());
        assert!(ServiceError::RateLimit { retry_after: None }.is_retryable());
        assert!(ServiceError::Connection {
            message: "bad gateway".to_string(),
            status: Some(502),
        }
        .is_retryable());

        assert!(!ServiceError::Authentication("401".to_string()).is_retryable());
        assert!(!ServiceError::CircuitOpen {
            retry_after: Duration::from_secs(60)
        }
        .is_retryable());
        assert!(!parsing().is_retryable());
        assert!(!ServiceError::InvalidRequest {
            status: 400,
            message: "bad".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_only_transport_failures_count_against_breaker() {
        assert!(ServiceError::connection("x").counts_against_breaker());
        assert!(ServiceError::Timeout("x".to_string()).counts_against_breaker());
        assert!(ServiceError::RateLimit { retry_after: None }.counts_against_breaker());
        assert!(!ServiceError::Authentication("x".to_string()).counts_against_breaker());
        assert!(!parsing().counts_against_breaker());
    }

    #[test]
    fn test_retry_after_hints() {
        let rate = ServiceError::RateLimit {
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(rate.retry_after(), Some(Duration::from_secs(7)));

        let open = ServiceError::CircuitOpen {
            retry_after: Duration::from_secs(60),
        };
        assert_eq!(open.retry_after(), Some(Duration::from_secs(60)));
        assert!(open.is_circuit_open());

        assert_eq!(ServiceError::connection("x").retry_after(), None);
    }

    #[test]
    fn test_error_display() {
        let err = ServiceError::CircuitOpen {
            retry_after: Duration::from_secs(60),
        };
        assert_eq!(
            err.to_string(),
            "Service temporarily degraded, retry after 60 seconds"
        );

        let err = ServiceError::Connection {
            message: "HTTP 503: down".to_string(),
            status: Some(503),
        };
        assert_eq!(err.to_string(), "Connection Error: HTTP 503: down");

        assert_eq!(
            ServiceError::RateLimit { retry_after: None }.to_string(),
            "Rate Limit Exceeded"
        );
    }

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(ServiceError::connection("x").kind(), "connection");
        assert_eq!(parsing().kind(), "parsing");
        assert_eq!(
            ServiceError::CircuitOpen {
                retry_after: Duration::ZERO
            }
            .kind(),
            "circuit_open"
        );
    }
}
