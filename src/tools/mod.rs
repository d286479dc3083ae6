//! Invocable capabilities exposed to the tool-calling agent.

pub mod knowledge;
pub mod web_search;

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::errors::ApiError;
use crate::llm::ToolSpec;

pub use knowledge::KnowledgeTool;
pub use web_search::WebSearchTool;

/// A named capability the agent can invoke with a query string.
///
/// The knowledge base and the web search share this contract so the agent
/// treats them uniformly; concrete tools are independent implementations,
/// not a hierarchy.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn invoke(&self, query: &str) -> Result<String, ApiError>;
}

/// Build the tool catalog handed to the model.
pub fn catalog(tools: &[Arc<dyn Tool>]) -> Vec<ToolSpec> {
    tools
        .iter()
        .map(|tool| ToolSpec {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
        })
        .collect()
}
