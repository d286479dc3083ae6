//! Web-search fallback tool backed by the Tavily API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::errors::ApiError;

use super::Tool;

pub const WEB_SEARCH_TOOL_NAME: &str = "web_search";

const DESCRIPTION: &str = "\
Search the public web for current information that is not covered by the \
ChillStay knowledge base, such as travel conditions, locations or events.";

const SEARCH_ENDPOINT: &str = "https://api.tavily.com/search";
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct WebSearchTool {
    api_key: String,
    max_results: usize,
    endpoint: String,
    client: Client,
}

impl WebSearchTool {
    pub fn new(api_key: String, max_results: usize) -> Self {
        Self {
            api_key,
            max_results,
            endpoint: SEARCH_ENDPOINT.to_string(),
            client: Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        WEB_SEARCH_TOOL_NAME
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    async fn invoke(&self, query: &str) -> Result<String, ApiError> {
        if !self.is_configured() {
            return Err(ApiError::Internal(
                "Web search is not configured (missing TAVILY_API_KEY)".to_string(),
            ));
        }

        let body = json!({
            "api_key": self.api_key,
            "query": query,
            "max_results": self.max_results,
            "topic": "general",
        });

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !response.status().is_success() {
            return Err(ApiError::Internal(format!(
                "Web search failed: {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await.map_err(ApiError::internal)?;
        Ok(format_results(&payload))
    }
}

fn format_results(payload: &Value) -> String {
    let mut blocks = Vec::new();

    if let Some(answer) = payload.get("answer").and_then(|v| v.as_str()) {
        if !answer.is_empty() {
            blocks.push(answer.to_string());
        }
    }

    if let Some(results) = payload.get("results").and_then(|v| v.as_array()) {
        for result in results {
            let title = result.get("title").and_then(|v| v.as_str()).unwrap_or("");
            let url = result.get("url").and_then(|v| v.as_str()).unwrap_or("");
            let content = result
                .get("content")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            if title.is_empty() && content.is_empty() {
                continue;
            }
            blocks.push(format!("{}\n{}\n{}", title, url, content));
        }
    }

    blocks.join("\n\n")
}
