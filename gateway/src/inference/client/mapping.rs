//! Upstream wire format.
//!
//! The completion service speaks the OpenAI-compatible
//! `chat/completions` shape. These DTOs never leave the client module.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::inference::types::{CallOptions, Message, ServiceResponse, Usage};

/// Upstream chat request format
#[derive(Debug, Serialize)]
pub struct CompletionRequestBody<'a> {
    /// The model identifier
    pub model: &'a str,
    /// The conversation messages
    pub messages: &'a [Message],
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound on generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Tool definitions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<&'a [Value]>,
}

/// Upstream choice structure
#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    /// The generated message
    pub message: ChoiceMessage,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Message inside a choice; content is null when the model only calls tools
#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    /// Generated text
    #[serde(default)]
    pub content: Option<String>,
}

/// Upstream usage information
#[derive(Debug, Deserialize)]
pub struct CompletionUsage {
    /// Number of tokens in the prompt
    #[serde(rename = "prompt_tokens", default)]
    pub prompt: u32,
    /// Number of tokens in the completion
    #[serde(rename = "completion_tokens", default)]
    pub completion: u32,
    /// Total number of tokens used
    #[serde(rename = "total_tokens", default)]
    pub total: u32,
}

/// Upstream chat response format
#[derive(Debug, Deserialize)]
pub struct CompletionResponseBody {
    /// Model that served the request
    #[serde(default)]
    pub model: Option<String>,
    /// The generated completion choices
    pub choices: Vec<CompletionChoice>,
    /// Token usage information if available
    #[serde(default)]
    pub usage: Option<CompletionUsage>,
}

/// Creates an upstream request from the caller's messages and options
#[must_use]
pub fn create_request<'a>(
    model: &'a str,
    messages: &'a [Message],
    options: &'a CallOptions,
) -> CompletionRequestBody<'a> {
    CompletionRequestBody {
        model,
        messages,
        temperature: options.temperature,
        max_tokens: options.max_tokens,
        tools: options.tools.as_deref(),
    }
}

/// Maps an upstream response to a [`ServiceResponse`]
///
/// # Errors
///
/// Returns an error if no choices are returned in the response.
pub fn map_response(
    body: CompletionResponseBody,
    requested_model: &str,
) -> Result<ServiceResponse, String> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| "No choices returned".to_string())?;

    Ok(ServiceResponse {
        content: choice.message.content.unwrap_or_default(),
        model: body.model.unwrap_or_else(|| requested_model.to_string()),
        usage: body.usage.map(|u| Usage {
            prompt_tokens: u.prompt,
            completion_tokens: u.completion,
            total_tokens: u.total,
        }),
        finish_reason: choice.finish_reason,
    })
}
