use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Runtime configuration for the assistant backend.
///
/// Values come from `config.toml` (when present) with environment-variable
/// overrides for deployment-specific settings and secrets.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Directory scanned for `.txt` knowledge-base documents.
    pub docs_dir: PathBuf,
    /// SQLite database path for durable chat history.
    /// When absent, history lives in process memory only.
    pub db_path: Option<PathBuf>,
    /// Directory for rolling log files.
    pub log_dir: PathBuf,
    /// Google Generative Language API key.
    pub google_api_key: String,
    /// Tavily web-search API key.
    pub tavily_api_key: String,
    /// Chat/generation model id.
    pub model: String,
    /// Embedding model id.
    pub embedding_model: String,
    /// Base URL of the Generative Language API.
    pub llm_base_url: String,
    /// Maximum chunk size in bytes of UTF-8 text, cut on char boundaries.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks, in bytes.
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per query.
    pub retrieval_k: usize,
    /// Maximum history messages supplied to generation.
    pub history_limit: usize,
    /// Maximum tool-call rounds before the agent gives up.
    pub max_tool_rounds: usize,
    /// Maximum web-search results per query.
    pub search_max_results: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            docs_dir: PathBuf::from("knowledge"),
            db_path: None,
            log_dir: PathBuf::from("logs"),
            google_api_key: String::new(),
            tavily_api_key: String::new(),
            model: "gemini-2.5-flash".to_string(),
            embedding_model: "text-embedding-004".to_string(),
            llm_base_url: "https://generativelanguage.googleapis.com".to_string(),
            chunk_size: 1200,
            chunk_overlap: 200,
            retrieval_k: 4,
            history_limit: 20,
            max_tool_rounds: 5,
            search_max_results: 2,
        }
    }
}

impl AppConfig {
    /// Load configuration from disk and the environment.
    pub fn load() -> Self {
        let path = env::var("CHILLSTAY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = Self::from_file(&path).unwrap_or_default();
        config.apply_env_overrides();
        config
    }

    fn from_file(path: &Path) -> Option<Self> {
        let raw = std::fs::read_to_string(path).ok()?;
        match toml::from_str::<AppConfig>(&raw) {
            Ok(config) => Some(config),
            Err(err) => {
                tracing::warn!("Ignoring malformed config file {:?}: {}", path, err);
                None
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(port) = env::var("PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.port = port;
            }
        }
        if let Ok(dir) = env::var("CHILLSTAY_DOCS_DIR") {
            self.docs_dir = PathBuf::from(dir);
        }
        if let Ok(path) = env::var("CHILLSTAY_DB_PATH") {
            self.db_path = Some(PathBuf::from(path));
        }
        if let Ok(key) = env::var("GOOGLE_API_KEY") {
            self.google_api_key = key;
        }
        if let Ok(key) = env::var("TAVILY_API_KEY") {
            self.tavily_api_key = key;
        }
    }
}
