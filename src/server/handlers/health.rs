use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::history::HistoryStore;
use crate::llm::LlmProvider;
use crate::state::AppState;

/// Diagnostics snapshot. Purely observational: nothing here is part of
/// the generation contract.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let storage_connected = state.history.ping().await;
    Json(json!({
        "status": "healthy",
        "model": state.provider.model_id(),
        "knowledge_base": {
            "documents": state.stats.documents,
            "chunks": state.stats.chunks,
            "chunk_size": state.config.chunk_size,
            "chunk_overlap": state.config.chunk_overlap,
            "index_size": state.index.len(),
            "embedding_dimension": state.index.dimension(),
            "retrieval_k": state.config.retrieval_k,
        },
        "tools": state.agent.tool_names(),
        "web_search_configured": state.web_search_configured,
        "storage": {
            "backend": state.history.backend_name(),
            "connected": storage_connected,
            "history_limit": state.config.history_limit,
        },
        "started_at": state.started_at.to_rfc3339(),
    }))
}
