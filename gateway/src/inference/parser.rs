//! Defensive extraction of structured payloads from response text.
//!
//! Models often wrap JSON in a fenced block (optionally tagged with a
//! language). [`parse_structured`] removes exactly that wrapping and nothing
//! else: there is no guessing, repair, or coercion. Call sites pick a
//! deterministic fallback with [`parse_or`] or [`complete_structured`] so a
//! malformed reply degrades the workflow instead of aborting it.

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::inference::provider::CompletionProvider;
use crate::inference::types::{CallOptions, Message, ServiceError};
use crate::infrastructure::metrics;

const FENCE: &str = "```";

/// Removes a surrounding fenced block, if any, and trims whitespace.
///
/// When the trimmed content starts with a fence, its first line (the fence
/// and any language tag) is dropped, and so is the last non-empty line if
/// it is a bare closing fence.
#[must_use]
pub fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    if !trimmed.starts_with(FENCE) {
        return trimmed;
    }

    let body = trimmed
        .split_once('\n')
        .map_or("", |(_, rest)| rest)
        .trim_end();

    let body = match body.rsplit_once('\n') {
        Some((head, last)) if last.trim() == FENCE => head,
        None if body.trim() == FENCE => "",
        _ => body,
    };

    body.trim()
}

/// Parses response text into `T`.
///
/// # Errors
///
/// Returns [`ServiceError::Parsing`] carrying the original, untouched text
/// when the content is not valid JSON for `T`.
pub fn parse_structured<T: DeserializeOwned>(content: &str) -> Result<T, ServiceError> {
    serde_json::from_str(strip_fences(content)).map_err(|e| ServiceError::Parsing {
        raw_content: content.to_string(),
        reason: e.to_string(),
    })
}

/// Parses response text, substituting `fallback` on failure.
pub fn parse_or<T: DeserializeOwned>(content: &str, fallback: T) -> T {
    parse_or_else(content, || fallback)
}

/// Parses response text, substituting the result of `fallback` on failure.
pub fn parse_or_else<T, F>(content: &str, fallback: F) -> T
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match parse_structured(content) {
        Ok(value) => value,
        Err(error) => {
            warn!(error = %error, content_len = content.len(), "Structured parse failed, using fallback");
            fallback()
        }
    }
}

/// Calls the provider and extracts a structured payload from the reply.
///
/// Transport and breaker errors propagate so the caller can present them
/// (e.g. "temporarily degraded, retry after N seconds"). A
/// [`ServiceError::Parsing`] never escapes: it is logged, counted under
/// `site`, and replaced by `fallback`.
///
/// # Errors
///
/// Returns every [`ServiceError`] variant except `Parsing`.
pub async fn complete_structured<T, P>(
    provider: &P,
    site: &str,
    messages: &[Message],
    options: &CallOptions,
    fallback: T,
) -> Result<T, ServiceError>
where
    T: DeserializeOwned,
    P: CompletionProvider + ?Sized,
{
    let parsed = match provider.call(messages, options).await {
        Ok(response) => parse_structured(&response.content),
        Err(error) => Err(error),
    };

    match parsed {
        Ok(value) => Ok(value),
        Err(ServiceError::Parsing { raw_content, reason }) => {
            warn!(
                site,
                reason = %reason,
                content_len = raw_content.len(),
                "Malformed structured response, using fallback"
            );
            metrics::record_parse_fallback(site);
            Ok(fallback)
        }
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::types::ServiceResponse;
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::{json, Value};
    use std::time::Duration;

    #[test]
    fn test_fenced_json_with_language_tag() {
        let value: Value = parse_structured("```json\n{\"a\":1}\n```").unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_fenced_matches_unwrapped() {
        let payload = r#"{"items": [1, 2, 3], "ok": true}"#;
        let plain: Value = parse_structured(payload).unwrap();

        for wrapped in [
            format!("```json\n{payload}\n```"),
            format!("```\n{payload}\n```"),
            format!("  \n```JSON\n{payload}\n```\n\n  "),
            format!("```json\n{payload}\n```   \n"),
        ] {
            let value: Value = parse_structured(&wrapped).unwrap();
            assert_eq!(value, plain, "input: {wrapped:?}");
        }
    }

    #[test]
    fn test_missing_closing_fence_is_tolerated() {
        let value: Value = parse_structured("```json\n{\"a\":1}").unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_plain_json_with_whitespace() {
        let value: Value = parse_structured("\n  [1, 2]  \n").unwrap();
        assert_eq!(value, json!([1, 2]));
    }

    #[test]
    fn test_non_json_preserves_raw_content() {
        match parse_structured::<Value>("not json at all") {
            Err(ServiceError::Parsing { raw_content, .. }) => {
                assert_eq!(raw_content, "not json at all");
            }
            other => panic!("Expected ParsingError, got {other:?}"),
        }

        let original = "  ```json\n{broken\n```  ";
        match parse_structured::<Value>(original) {
            Err(ServiceError::Parsing { raw_content, .. }) => assert_eq!(raw_content, original),
            other => panic!("Expected ParsingError, got {other:?}"),
        }
    }

    #[test]
    fn test_strip_fences_edge_cases() {
        assert_eq!(strip_fences("```"), "");
        assert_eq!(strip_fences("```json\n```"), "");
        assert_eq!(strip_fences("plain"), "plain");
        assert_eq!(strip_fences("```\nline1\nline2\n```"), "line1\nline2");
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Verdict {
        score: u8,
        notes: Vec<String>,
    }

    #[test]
    fn test_parse_into_typed_struct() {
        let verdict: Verdict =
            parse_structured("```json\n{\"score\": 7, \"notes\": [\"ok\"]}\n```").unwrap();
        assert_eq!(verdict.score, 7);
    }

    #[test]
    fn test_parse_or_uses_fallback() {
        let value: Vec<String> = parse_or("nope", vec!["needs manual review".to_string()]);
        assert_eq!(value, vec!["needs manual review".to_string()]);

        let value: Vec<u8> = parse_or_else("[1]", Vec::new);
        assert_eq!(value, vec![1]);
    }

    struct ScriptedProvider {
        reply: Result<ServiceResponse, ServiceError>,
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn call(
            &self,
            _messages: &[Message],
            _options: &CallOptions,
        ) -> Result<ServiceResponse, ServiceError> {
            self.reply.clone()
        }
    }

    fn reply(content: &str) -> ScriptedProvider {
        ScriptedProvider {
            reply: Ok(ServiceResponse::new(content, "gpt-4")),
        }
    }

    #[tokio::test]
    async fn complete_structured_parses_fenced_reply() {
        let provider = reply("```json\n{\"score\": 3, \"notes\": []}\n```");
        let verdict = complete_structured(
            &provider,
            "verdict",
            &[Message::user("rate")],
            &CallOptions::new(),
            Verdict {
                score: 0,
                notes: vec![],
            },
        )
        .await
        .unwrap();
        assert_eq!(verdict.score, 3);
    }

    #[tokio::test]
    async fn complete_structured_degrades_to_fallback() {
        let provider = reply("I'm sorry, I can't produce JSON today.");
        let value: Value = complete_structured(
            &provider,
            "summary",
            &[],
            &CallOptions::new(),
            json!({"status": "needs manual review"}),
        )
        .await
        .unwrap();
        assert_eq!(value["status"], "needs manual review");
    }

    #[tokio::test]
    async fn complete_structured_swallows_envelope_parsing_errors() {
        let provider = ScriptedProvider {
            reply: Err(ServiceError::Parsing {
                raw_content: "<html>".to_string(),
                reason: "Invalid completion envelope".to_string(),
            }),
        };
        let value: Vec<u32> = complete_structured(&provider, "ids", &[], &CallOptions::new(), vec![])
            .await
            .unwrap();
        assert!(value.is_empty());
    }

    #[tokio::test]
    async fn complete_structured_propagates_circuit_open() {
        let provider = ScriptedProvider {
            reply: Err(ServiceError::CircuitOpen {
                retry_after: Duration::from_secs(60),
            }),
        };
        let result: Result<Value, _> =
            complete_structured(&provider, "summary", &[], &CallOptions::new(), Value::Null).await;

        let error = result.unwrap_err();
        assert!(error.is_circuit_open());
        assert_eq!(
            error.to_string(),
            "Service temporarily degraded, retry after 60 seconds"
        );
    }
}
