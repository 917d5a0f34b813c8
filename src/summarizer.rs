use async_trait::async_trait;

use crate::anthropic::AnthropicClient;
use crate::types::LlmError;

/// The summarization seam.
///
/// Production wires in [`AnthropicClient`]; tests substitute scripted
/// implementations to control responses and count calls.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, LlmError>;
}

#[async_trait]
impl Summarizer for AnthropicClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
        self.complete(model, prompt).await
    }
}
