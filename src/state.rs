use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::chat::{AgentRunner, DirectChain};
use crate::core::config::AppConfig;
use crate::history::{HistoryStore, MemoryHistory, SqliteHistory};
use crate::llm::{GeminiProvider, LlmProvider};
use crate::rag::{chunker, loader, Chunk, VectorIndex};
use crate::tools::{KnowledgeTool, Tool, WebSearchTool};

const EMBED_BATCH_SIZE: usize = 64;

/// Corpus sizing captured at index build, for the health snapshot.
#[derive(Debug, Clone, Copy)]
pub struct CorpusStats {
    pub documents: usize,
    pub chunks: usize,
}

pub struct AppState {
    pub config: AppConfig,
    pub provider: Arc<dyn LlmProvider>,
    pub index: Arc<VectorIndex>,
    pub chain: DirectChain,
    pub agent: AgentRunner,
    pub history: Arc<dyn HistoryStore>,
    pub stats: CorpusStats,
    pub web_search_configured: bool,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Full startup: load the corpus, embed it, build the index and wire
    /// every component together.
    pub async fn initialize(config: AppConfig) -> anyhow::Result<Arc<Self>> {
        if config.google_api_key.is_empty() || config.tavily_api_key.is_empty() {
            tracing::warn!("Missing GOOGLE_API_KEY or TAVILY_API_KEY in environment variables");
        }

        let provider: Arc<dyn LlmProvider> = Arc::new(GeminiProvider::new(
            config.llm_base_url.clone(),
            config.google_api_key.clone(),
            config.model.clone(),
            config.embedding_model.clone(),
        )?);

        let documents = loader::load_documents(&config.docs_dir);
        if documents.is_empty() {
            tracing::warn!(
                "No .txt documents were loaded into the knowledge base from {:?}",
                config.docs_dir
            );
        }

        let mut chunks: Vec<Chunk> = Vec::new();
        for document in &documents {
            chunks.extend(chunker::split(
                document,
                config.chunk_size,
                config.chunk_overlap,
            ));
        }

        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.content.clone()).collect();
            embeddings.extend(provider.embed(&texts).await?);
        }

        let stats = CorpusStats {
            documents: documents.len(),
            chunks: chunks.len(),
        };
        let index = Arc::new(VectorIndex::build(
            chunks.into_iter().zip(embeddings).collect(),
        )?);
        tracing::info!(
            documents = stats.documents,
            chunks = stats.chunks,
            dimension = index.dimension(),
            "Vector store initialized with documents"
        );

        let history: Arc<dyn HistoryStore> = match &config.db_path {
            Some(path) => Arc::new(SqliteHistory::new(path.clone(), config.history_limit).await?),
            None => Arc::new(MemoryHistory::new(config.history_limit)),
        };

        Ok(Self::assemble(config, provider, index, history, stats))
    }

    /// Wire the generation paths and tools around pre-built parts.
    /// `initialize` uses this after startup work; tests use it directly
    /// with mock providers and hand-built indexes.
    pub fn assemble(
        config: AppConfig,
        provider: Arc<dyn LlmProvider>,
        index: Arc<VectorIndex>,
        history: Arc<dyn HistoryStore>,
        stats: CorpusStats,
    ) -> Arc<Self> {
        let knowledge_tool: Arc<dyn Tool> = Arc::new(KnowledgeTool::new(
            index.clone(),
            provider.clone(),
            config.retrieval_k,
        ));
        let web_search =
            WebSearchTool::new(config.tavily_api_key.clone(), config.search_max_results);
        let web_search_configured = web_search.is_configured();
        let tools: Vec<Arc<dyn Tool>> = vec![knowledge_tool, Arc::new(web_search)];

        let chain = DirectChain::new(index.clone(), provider.clone(), config.retrieval_k);
        let agent = AgentRunner::new(provider.clone(), tools, config.max_tool_rounds);
        tracing::info!(tools = ?agent.tool_names(), "Agent ready");

        Arc::new(Self {
            config,
            provider,
            index,
            chain,
            agent,
            history,
            stats,
            web_search_configured,
            started_at: Utc::now(),
        })
    }
}
