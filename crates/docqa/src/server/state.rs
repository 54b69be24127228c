//! Application state for the Q&A server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::generation::AnswerSynthesizer;
use crate::ingestion::{IngestPipeline, TextChunker};
use crate::processing::BlockingPool;
use crate::providers::{EmbeddingProvider, LlmProvider, OpenAiClient};
use crate::retrieval::RetrievalParams;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Embedding provider
    embedder: Arc<dyn EmbeddingProvider>,
    /// LLM provider
    llm: Arc<dyn LlmProvider>,
    /// Chunker built from the chunking section
    chunker: TextChunker,
    /// Pool for parsing and chunking
    pool: BlockingPool,
}

impl AppState {
    /// Create state backed by the OpenAI API
    pub fn new(config: RagConfig) -> Result<Self> {
        let client = Arc::new(OpenAiClient::from_config(&config)?);
        tracing::info!(
            embedding_model = %config.embeddings.model,
            llm_model = %config.llm.model,
            "OpenAI client initialized"
        );
        Self::with_providers(config, client.clone(), client)
    }

    /// Create state with explicit providers
    pub fn with_providers(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        let chunker = TextChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;
        let pool = BlockingPool::new(config.processing.worker_threads);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                embedder,
                llm,
                chunker,
                pool,
            }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Ingestion pipeline for one request
    pub fn pipeline(&self) -> IngestPipeline {
        IngestPipeline::new(
            self.inner.chunker.clone(),
            Arc::clone(&self.inner.embedder),
            self.inner.pool.clone(),
        )
    }

    /// Answer synthesizer using the configured retrieval parameters
    pub fn synthesizer(&self) -> AnswerSynthesizer {
        let retrieval = &self.inner.config.retrieval;
        AnswerSynthesizer::new(
            Arc::clone(&self.inner.embedder),
            Arc::clone(&self.inner.llm),
            RetrievalParams::from(retrieval),
            retrieval.max_citations,
        )
    }

    /// Embedding model name, for cost estimates
    pub fn embedding_model(&self) -> &str {
        self.inner.embedder.model()
    }

    /// LLM model name, for cost estimates
    pub fn llm_model(&self) -> &str {
        self.inner.llm.model()
    }
}
