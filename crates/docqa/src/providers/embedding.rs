//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;

use super::usage::TokenUsage;
use crate::error::{Error, Result};

/// Embedding vectors for a batch of inputs
#[derive(Debug, Clone, Default)]
pub struct Embeddings {
    /// One vector per input, in input order
    pub vectors: Vec<Vec<f32>>,
    /// Tokens billed for the batch
    pub usage: TokenUsage,
}

/// Trait for generating text embeddings
///
/// Implementations:
/// - `OpenAiClient`: OpenAI compatible `/embeddings` endpoint
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for multiple texts, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Embeddings>;

    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .vectors
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("provider returned no embedding"))
    }

    /// Get embedding dimensions (3072 for text-embedding-3-large)
    fn dimensions(&self) -> usize;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the embedding model, used for cost estimates
    fn model(&self) -> &str;
}
