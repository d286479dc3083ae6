//! ChillStay assistant backend: a retrieval-augmented chat service with a
//! direct RAG chain, a tool-calling agent and session history.

pub mod chat;
pub mod core;
pub mod history;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
pub mod tools;
