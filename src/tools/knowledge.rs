//! Knowledge-base retrieval tool over the vector index.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::errors::ApiError;
use crate::llm::LlmProvider;
use crate::rag::VectorIndex;

use super::Tool;

pub const KNOWLEDGE_TOOL_NAME: &str = "chillstay_knowledge_base";

const DESCRIPTION: &str = "\
This tool contains the full knowledge base for the ChillStay app. \
Use it when the user asks about:
- how to register or sign in
- how to search for and book rooms
- payment and cancellation policies
- app features
- troubleshooting

ALWAYS use this tool FIRST for any question about ChillStay.";

pub struct KnowledgeTool {
    index: Arc<VectorIndex>,
    provider: Arc<dyn LlmProvider>,
    k: usize,
}

impl KnowledgeTool {
    /// `k` is fixed at construction; retrieval always asks for the same
    /// number of chunks.
    pub fn new(index: Arc<VectorIndex>, provider: Arc<dyn LlmProvider>, k: usize) -> Self {
        Self { index, provider, k }
    }
}

#[async_trait]
impl Tool for KnowledgeTool {
    fn name(&self) -> &str {
        KNOWLEDGE_TOOL_NAME
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    async fn invoke(&self, query: &str) -> Result<String, ApiError> {
        let embeddings = self.provider.embed(&[query.to_string()]).await?;
        let embedding = embeddings
            .first()
            .ok_or_else(|| ApiError::Internal("Embedder returned no vector".to_string()))?;

        let results = self.index.query(embedding, self.k)?;

        // Score order, blank-line separated, overlapping text tolerated.
        Ok(results
            .iter()
            .map(|(chunk, _)| chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}
