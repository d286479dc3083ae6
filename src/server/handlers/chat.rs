use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::history::{HistoryStore, StoredMessage, DEFAULT_SESSION_ID};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ClearRequest {
    pub session_id: Option<String>,
}

/// Tool-calling agent path, with full session history.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (message, session_id) = validate(&payload)?;

    // Snapshot the history before generation; no session lock is held
    // across the model or tool calls.
    let history = load_history(&state, &session_id).await;
    let reply = state.agent.run(&history, &message).await?;
    record_turn(&state, &session_id, &message, &reply).await;

    Ok(Json(json!({
        "response": reply,
        "session_id": session_id,
        "status": "success"
    })))
}

/// Direct RAG path: stateless generation, but the turn is still recorded
/// so a later agent request sees the full conversation.
pub async fn chat_fast(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (message, session_id) = validate(&payload)?;

    let reply = state.chain.answer(&message).await?;
    record_turn(&state, &session_id, &message, &reply).await;

    Ok(Json(json!({
        "response": reply,
        "session_id": session_id,
        "status": "success"
    })))
}

pub async fn clear(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<ClearRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id =
        resolve_session_id(payload.and_then(|Json(req)| req.session_id).as_deref());

    let removed = state.history.clear(&session_id).await?;
    tracing::debug!(session_id = %session_id, removed, "Cleared chat history");

    Ok(Json(json!({
        "message": "Chat history cleared",
        "status": "success"
    })))
}

fn validate(payload: &ChatRequest) -> Result<(String, String), ApiError> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(ApiError::BadRequest("Message cannot be empty".to_string()));
    }
    let session_id = resolve_session_id(payload.session_id.as_deref());
    Ok((message.to_string(), session_id))
}

fn resolve_session_id(session_id: Option<&str>) -> String {
    session_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(DEFAULT_SESSION_ID)
        .to_string()
}

/// Storage failures degrade to an empty history; the request proceeds.
async fn load_history(state: &AppState, session_id: &str) -> Vec<StoredMessage> {
    match state.history.get(session_id).await {
        Ok(history) => history,
        Err(err) => {
            tracing::warn!(session_id = %session_id, "History read failed: {}", err);
            Vec::new()
        }
    }
}

/// A failed append is logged, never surfaced: the user already has the
/// answer.
async fn record_turn(state: &AppState, session_id: &str, user_text: &str, assistant_text: &str) {
    if let Err(err) = state
        .history
        .append_turn(session_id, user_text, assistant_text)
        .await
    {
        tracing::warn!(session_id = %session_id, "History append failed: {}", err);
    }
}
