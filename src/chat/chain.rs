//! Direct answer chain: retrieve, compose, one model call.
//!
//! The low-latency path. Stateless per call: history is never consulted
//! here, and only the HTTP handler records the turn afterwards. There is
//! no retry; a model failure propagates to the caller.

use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, LlmProvider};
use crate::rag::VectorIndex;

use super::prompt::{compose_user_turn, non_empty_or_fallback, SYSTEM_PROMPT};

pub struct DirectChain {
    index: Arc<VectorIndex>,
    provider: Arc<dyn LlmProvider>,
    k: usize,
}

impl DirectChain {
    pub fn new(index: Arc<VectorIndex>, provider: Arc<dyn LlmProvider>, k: usize) -> Self {
        Self { index, provider, k }
    }

    pub async fn answer(&self, user_input: &str) -> Result<String, ApiError> {
        let embeddings = self.provider.embed(&[user_input.to_string()]).await?;
        let embedding = embeddings
            .first()
            .ok_or_else(|| ApiError::Internal("Embedder returned no vector".to_string()))?;

        let results = self.index.query(embedding, self.k)?;
        let context = results
            .iter()
            .map(|(chunk, _)| chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(compose_user_turn(&context, user_input)),
        ];

        let answer = self.provider.chat(&messages).await?;
        Ok(non_empty_or_fallback(answer))
    }
}
