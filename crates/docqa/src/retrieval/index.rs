//! In-memory exact vector index over embedded chunks

use crate::error::{Error, Result};
use crate::types::Chunk;

/// A chunk paired with its similarity to a query
#[derive(Debug, Clone, Copy)]
pub struct ScoredChunk<'a> {
    /// The matched chunk
    pub chunk: &'a Chunk,
    /// Cosine similarity to the query
    pub score: f32,
}

/// Brute-force cosine index; documents are small enough that exact search is cheap
#[derive(Debug, Default)]
pub struct VectorIndex {
    chunks: Vec<Chunk>,
    norms: Vec<f32>,
    dimensions: Option<usize>,
}

impl VectorIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an embedded chunk; the first chunk fixes the dimensionality
    pub fn insert(&mut self, chunk: Chunk) -> Result<()> {
        if !chunk.is_embedded() {
            return Err(Error::internal(format!(
                "chunk {} has no embedding",
                chunk.index
            )));
        }
        match self.dimensions {
            Some(dims) if dims != chunk.embedding.len() => {
                return Err(Error::embedding(format!(
                    "dimension mismatch: index has {}, chunk {} has {}",
                    dims,
                    chunk.index,
                    chunk.embedding.len()
                )));
            }
            Some(_) => {}
            None => self.dimensions = Some(chunk.embedding.len()),
        }

        self.norms.push(magnitude(&chunk.embedding));
        self.chunks.push(chunk);
        Ok(())
    }

    /// The `n` most similar chunks, by descending similarity
    pub fn search(&self, query: &[f32], n: usize) -> Vec<ScoredChunk<'_>> {
        if n == 0 || self.chunks.is_empty() || Some(query.len()) != self.dimensions {
            return Vec::new();
        }

        let query_norm = magnitude(query);
        let mut scored: Vec<ScoredChunk<'_>> = self
            .chunks
            .iter()
            .zip(&self.norms)
            .map(|(chunk, &norm)| ScoredChunk {
                chunk,
                score: cosine_with_norms(query, &chunk.embedding, query_norm, norm),
            })
            .collect();

        // Stable sort keeps document order among equal scores
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(n);
        scored
    }

    /// Number of indexed chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding dimensionality, once a chunk was inserted
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    /// All chunks in insertion order
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }
}

/// Euclidean norm
pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity; zero vectors are dissimilar to everything
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    cosine_with_norms(a, b, magnitude(a), magnitude(b))
}

pub(crate) fn cosine_with_norms(a: &[f32], b: &[f32], norm_a: f32, norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedded(index: u32, page: u32, embedding: Vec<f32>) -> Chunk {
        let mut chunk = Chunk::new(index, "doc.pdf".into(), Some(page), format!("chunk {index}"), 2);
        chunk.embedding = embedding;
        chunk
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let mut index = VectorIndex::new();
        index.insert(embedded(0, 1, vec![0.0, 1.0])).unwrap();
        index.insert(embedded(1, 2, vec![1.0, 0.1])).unwrap();
        index.insert(embedded(2, 3, vec![1.0, 1.0])).unwrap();

        let results = index.search(&[1.0, 0.0], 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.index, 1);
        assert_eq!(results[1].chunk.index, 2);
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn test_search_caps_at_len() {
        let mut index = VectorIndex::new();
        index.insert(embedded(0, 1, vec![1.0, 0.0])).unwrap();
        assert_eq!(index.search(&[1.0, 0.0], 25).len(), 1);
        assert!(index.search(&[1.0, 0.0], 0).is_empty());
    }

    #[test]
    fn test_insert_rejects_missing_embedding() {
        let mut index = VectorIndex::new();
        let chunk = Chunk::new(0, "doc.pdf".into(), Some(1), "text".into(), 1);
        assert!(index.insert(chunk).is_err());
        assert!(index.is_empty());
    }

    #[test]
    fn test_insert_rejects_dimension_mismatch() {
        let mut index = VectorIndex::new();
        index.insert(embedded(0, 1, vec![1.0, 0.0])).unwrap();
        assert!(index.insert(embedded(1, 1, vec![1.0, 0.0, 0.0])).is_err());
        assert_eq!(index.len(), 1);
        assert_eq!(index.dimensions(), Some(2));
    }

    #[test]
    fn test_wrong_query_dimension_finds_nothing() {
        let mut index = VectorIndex::new();
        index.insert(embedded(0, 1, vec![1.0, 0.0])).unwrap();
        assert!(index.search(&[1.0, 0.0, 0.0], 5).is_empty());
    }
}
