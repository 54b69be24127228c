//! Retrieval over a single document's chunks: similarity search then MMR

pub mod index;
pub mod mmr;

pub use index::{cosine_similarity, ScoredChunk, VectorIndex};
pub use mmr::mmr_rerank;

use crate::config::RetrievalConfig;

/// Minimum `k` for the second, wider retrieval pass
const WIDENED_K: usize = 16;
/// Minimum `fetch_k` for the second, wider retrieval pass
const WIDENED_FETCH_K: usize = 80;

/// Search parameters for one retrieval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalParams {
    /// Chunks handed to the LLM
    pub k: usize,
    /// Candidates fetched before MMR
    pub fetch_k: usize,
    /// MMR balance: 1.0 = pure relevance, 0.0 = pure diversity
    pub lambda_mult: f32,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            k: 10,
            fetch_k: 25,
            lambda_mult: 0.7,
        }
    }
}

impl From<&RetrievalConfig> for RetrievalParams {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            k: config.k,
            fetch_k: config.fetch_k,
            lambda_mult: config.lambda_mult,
        }
    }
}

impl RetrievalParams {
    /// Higher-recall parameters for retrying a not-found answer
    pub fn widened(&self) -> Self {
        Self {
            k: self.k.max(WIDENED_K),
            fetch_k: self.fetch_k.max(WIDENED_FETCH_K),
            lambda_mult: self.lambda_mult,
        }
    }
}

/// MMR retriever over an immutable vector index
#[derive(Debug, Default)]
pub struct Retriever {
    index: VectorIndex,
}

impl Retriever {
    /// Wrap a built index
    pub fn new(index: VectorIndex) -> Self {
        Self { index }
    }

    /// Fetch `max(fetch_k, k)` candidates by similarity, then pick `k` with MMR
    pub fn retrieve(&self, query_embedding: &[f32], params: &RetrievalParams) -> Vec<ScoredChunk<'_>> {
        let fetch = params.fetch_k.max(params.k);
        let candidates = self.index.search(query_embedding, fetch);
        mmr_rerank(query_embedding, candidates, params.k, params.lambda_mult)
    }

    /// The underlying index
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }
}
