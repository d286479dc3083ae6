//! Google Generative Language API provider.
//!
//! Talks to the `generateContent` / `batchEmbedContents` REST endpoints
//! and normalizes every response into a [`ModelTurn`] so the rest of the
//! crate never sees raw payload shapes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::errors::ApiError;

use super::provider::LlmProvider;
use super::types::{ChatMessage, ModelTurn, ToolCall, ToolSpec};

const REQUEST_TIMEOUT_SECS: u64 = 60;

pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    model: String,
    embedding_model: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(
        base_url: String,
        api_key: String,
        model: String,
        embedding_model: String,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            embedding_model,
            client,
        })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url,
            self.model,
            urlencoding::encode(&self.api_key)
        )
    }

    fn embed_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:batchEmbedContents?key={}",
            self.base_url,
            self.embedding_model,
            urlencoding::encode(&self.api_key)
        )
    }

    async fn generate(&self, body: Value) -> Result<Value, ApiError> {
        let response = self
            .client
            .post(self.generate_url())
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "generateContent failed with {}: {}",
                status, text
            )));
        }

        response.json().await.map_err(ApiError::upstream)
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ApiError> {
        let body = build_request(messages, &[]);
        let payload = self.generate(body).await?;

        match extract_turn(&payload) {
            ModelTurn::Final(text) => Ok(text),
            // Without a tool catalog the model has nothing to call; an
            // unexpected call request degrades to an empty answer and the
            // caller's fallback takes over.
            ModelTurn::ToolCalls(_) => {
                tracing::warn!("Model requested tools on the direct path; ignoring");
                Ok(String::new())
            }
        }
    }

    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ModelTurn, ApiError> {
        let body = build_request(messages, tools);
        let payload = self.generate(body).await?;
        Ok(extract_turn(&payload))
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let model_path = format!("models/{}", self.embedding_model);
        let requests: Vec<Value> = inputs
            .iter()
            .map(|text| {
                json!({
                    "model": model_path,
                    "content": { "parts": [{ "text": text }] }
                })
            })
            .collect();

        let response = self
            .client
            .post(self.embed_url())
            .json(&json!({ "requests": requests }))
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "batchEmbedContents failed with {}: {}",
                status, text
            )));
        }

        let payload: Value = response.json().await.map_err(ApiError::upstream)?;
        let embeddings = payload
            .get("embeddings")
            .and_then(|v| v.as_array())
            .ok_or_else(|| ApiError::Upstream("Embedding response missing values".to_string()))?;

        let mut vectors = Vec::with_capacity(embeddings.len());
        for entry in embeddings {
            let values = entry
                .get("values")
                .and_then(|v| v.as_array())
                .ok_or_else(|| {
                    ApiError::Upstream("Embedding entry missing values".to_string())
                })?;
            vectors.push(
                values
                    .iter()
                    .filter_map(|v| v.as_f64().map(|f| f as f32))
                    .collect(),
            );
        }

        if vectors.len() != inputs.len() {
            return Err(ApiError::Upstream(format!(
                "Embedding count mismatch: {} inputs, {} vectors",
                inputs.len(),
                vectors.len()
            )));
        }

        Ok(vectors)
    }
}

fn build_request(messages: &[ChatMessage], tools: &[ToolSpec]) -> Value {
    let mut system_parts: Vec<String> = Vec::new();
    let mut contents: Vec<Value> = Vec::new();

    for message in messages {
        match message.role.as_str() {
            "system" => system_parts.push(message.content.clone()),
            "assistant" => contents.push(content_part("model", &message.content)),
            // Tool results travel back as user-visible turns; the agent
            // labels them before they get here.
            _ => contents.push(content_part("user", &message.content)),
        }
    }

    let mut body = json!({
        "contents": contents,
        "generationConfig": { "temperature": 0 }
    });

    if let Some(obj) = body.as_object_mut() {
        if !system_parts.is_empty() {
            obj.insert(
                "systemInstruction".to_string(),
                json!({ "parts": [{ "text": system_parts.join("\n\n") }] }),
            );
        }
        if !tools.is_empty() {
            let declarations: Vec<Value> = tools
                .iter()
                .map(|tool| {
                    json!({
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": {
                            "type": "OBJECT",
                            "properties": {
                                "query": {
                                    "type": "STRING",
                                    "description": "Search query string entered by the user"
                                }
                            },
                            "required": ["query"]
                        }
                    })
                })
                .collect();
            obj.insert(
                "tools".to_string(),
                json!([{ "functionDeclarations": declarations }]),
            );
        }
    }

    body
}

/// Normalize a `generateContent` payload into a tagged turn.
///
/// Precedence: function-call parts win; otherwise joined text parts;
/// otherwise the stringified candidate content. Empty text is returned
/// as-is — substituting the user-facing fallback is the caller's job.
fn extract_turn(payload: &Value) -> ModelTurn {
    let parts = payload
        .get("candidates")
        .and_then(|v| v.as_array())
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|v| v.as_array());

    let Some(parts) = parts else {
        tracing::warn!("Unrecognized model response shape: {}", payload);
        return ModelTurn::Final(stringify_fallback(payload));
    };

    let mut calls = Vec::new();
    let mut text_parts = Vec::new();
    for part in parts {
        if let Some(call) = part.get("functionCall") {
            let name = call
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let query = call
                .get("args")
                .and_then(|args| {
                    args.get("query")
                        .or_else(|| args.get("q"))
                        .or_else(|| args.get("input"))
                })
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            if !name.is_empty() {
                calls.push(ToolCall { name, query });
            }
        } else if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
            text_parts.push(text);
        }
    }

    if !calls.is_empty() {
        return ModelTurn::ToolCalls(calls);
    }

    ModelTurn::Final(text_parts.join("").trim().to_string())
}

fn content_part(role: &str, text: &str) -> Value {
    json!({ "role": role, "parts": [{ "text": text }] })
}

fn stringify_fallback(payload: &Value) -> String {
    payload
        .get("candidates")
        .and_then(|v| v.as_array())
        .and_then(|candidates| candidates.last())
        .and_then(|candidate| candidate.get("content"))
        .map(|content| content.to_string())
        .unwrap_or_default()
}
