//! Language-model boundary: provider trait, message types and the Gemini
//! REST implementation.

pub mod gemini;
pub mod provider;
pub mod types;

pub use gemini::GeminiProvider;
pub use provider::LlmProvider;
pub use types::{ChatMessage, ModelTurn, ToolCall, ToolSpec};
