use async_trait::async_trait;

use crate::core::errors::ApiError;

use super::types::{ChatMessage, ModelTurn, ToolSpec};

/// Boundary to the language-model service.
///
/// Implementations are stateless per call: conversation state is passed in
/// as the message list on every invocation.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// The generation model id, for diagnostics.
    fn model_id(&self) -> &str;

    /// Single chat completion with no tool access.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ApiError>;

    /// Chat completion with a tool catalog; the model may answer or
    /// request tool invocations.
    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ModelTurn, ApiError>;

    /// Embed a batch of texts into fixed-dimension vectors, one per input,
    /// in input order. A single text is the one-element batch.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;
}
