use crate::inference::types::{CallOptions, Message, ServiceResponse, ServiceError};
use async_trait::async_trait;

/// Anything that can answer a completion call.
///
/// [`ServiceClient`](crate::inference::ServiceClient) is the production
/// implementation; call sites depend on this trait so they can be exercised
/// against a scripted upstream.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Executes a completion call.
    async fn call(
        &self,
        messages: &[Message],
        options: &CallOptions,
    ) -> Result<ServiceResponse, ServiceError>;
}
