//! Response types for completion calls.
//!
//! This module contains response and usage definitions returned on success.

use serde::{Deserialize, Serialize};

/// Token usage information for a completion request.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    /// Number of tokens in the prompt
    pub prompt_tokens: u32,
    /// Number of tokens in the completion
    pub completion_tokens: u32,
    /// Total number of tokens used
    pub total_tokens: u32,
}

/// Successful response from the completion service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceResponse {
    /// The generated content
    pub content: String,
    /// Model that produced the content
    pub model: String,
    /// Token usage information, if available
    pub usage: Option<Usage>,
    /// Why generation stopped, if reported
    pub finish_reason: Option<String>,
}

impl ServiceResponse {
    /// Creates a response with no usage or finish reason.
    #[must_use]
    pub fn new(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            usage: None,
            finish_reason: None,
        }
    }

    /// Returns the total token count if available
    #[must_use]
    pub fn total_tokens(&self) -> Option<u32> {
        self.usage.as_ref().map(|u| u.total_tokens)
    }

    /// Returns true if generation was cut off by the token limit
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.finish_reason.as_deref() == Some("length")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_response_new() {
        let response = ServiceResponse::new("Hello, world!", "gpt-4");
        assert_eq!(response.content, "Hello, world!");
        assert_eq!(response.model, "gpt-4");
        assert!(response.usage.is_none());
        assert!(response.total_tokens().is_none());
    }

    #[test]
    fn test_total_tokens() {
        let mut response = ServiceResponse::new("x", "gpt-4");
        response.usage = Some(Usage {
            prompt_tokens: 5,
            completion_tokens: 10,
            total_tokens: 15,
        });
        assert_eq!(response.total_tokens(), Some(15));
    }

    #[test]
    fn test_is_truncated() {
        let mut response = ServiceResponse::new("x", "gpt-4");
        assert!(!response.is_truncated());
        response.finish_reason = Some("length".to_string());
        assert!(response.is_truncated());
    }
}
