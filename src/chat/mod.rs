//! Generation strategies: the direct RAG chain and the tool-calling agent.

pub mod agent;
pub mod chain;
pub mod prompt;

pub use agent::AgentRunner;
pub use chain::DirectChain;
