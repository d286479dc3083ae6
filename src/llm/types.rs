use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: content.into(),
        }
    }
}

/// A capability the model may invoke during an agent run.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
}

/// A tool invocation requested by the model. Transient: consumed within
/// the agent run that produced it, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub query: String,
}

/// One model turn in the agent loop, already normalized by the provider.
///
/// The provider layer absorbs whatever shape the upstream API returns, so
/// downstream code never inspects raw payloads.
#[derive(Debug, Clone)]
pub enum ModelTurn {
    /// The model produced its final textual answer.
    Final(String),
    /// The model requested one or more tool invocations.
    ToolCalls(Vec<ToolCall>),
}
