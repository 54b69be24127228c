//! Maximal Marginal Relevance (MMR) for diversity-aware retrieval
//!
//! MMR = λ × similarity(query, doc) - (1-λ) × max(similarity(doc, selected_docs))
//!
//! λ = 1.0: Pure relevance (standard search)
//! λ = 0.5: Balanced relevance + diversity
//! λ = 0.0: Pure diversity

use super::index::{cosine_with_norms, magnitude, ScoredChunk};

/// Rerank candidates using Maximal Marginal Relevance
///
/// # Arguments
/// * `query` - Query vector
/// * `candidates` - Search results carrying their chunk embeddings
/// * `k` - Number of results to return (capped by the candidate count)
/// * `lambda` - Balance factor (0.0 = diversity, 1.0 = relevance)
///
/// # Returns
/// Up to `k` candidates in selection order, each keeping its query similarity
pub fn mmr_rerank<'a>(
    query: &[f32],
    candidates: Vec<ScoredChunk<'a>>,
    k: usize,
    lambda: f32,
) -> Vec<ScoredChunk<'a>> {
    if candidates.is_empty() || k == 0 {
        return Vec::new();
    }

    let k = k.min(candidates.len());
    let query_norm = magnitude(query);
    let norms: Vec<f32> = candidates
        .iter()
        .map(|c| magnitude(&c.chunk.embedding))
        .collect();
    let relevance: Vec<f32> = candidates
        .iter()
        .zip(&norms)
        .map(|(c, &norm)| cosine_with_norms(query, &c.chunk.embedding, query_norm, norm))
        .collect();

    // Highest similarity of each candidate to anything selected so far
    let mut redundancy = vec![f32::NEG_INFINITY; candidates.len()];
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();
    let mut selected: Vec<usize> = Vec::with_capacity(k);

    while selected.len() < k && !remaining.is_empty() {
        let mut best_pos = 0;
        let mut best_score = f32::NEG_INFINITY;

        for (pos, &idx) in remaining.iter().enumerate() {
            let score = if selected.is_empty() {
                relevance[idx]
            } else {
                lambda * relevance[idx] - (1.0 - lambda) * redundancy[idx]
            };
            if score > best_score {
                best_score = score;
                best_pos = pos;
            }
        }

        let chosen = remaining.remove(best_pos);
        selected.push(chosen);

        let chosen_vec = &candidates[chosen].chunk.embedding;
        for &idx in &remaining {
            let sim = cosine_with_norms(
                &candidates[idx].chunk.embedding,
                chosen_vec,
                norms[idx],
                norms[chosen],
            );
            redundancy[idx] = redundancy[idx].max(sim);
        }
    }

    selected.into_iter().map(|i| candidates[i]).collect()
}
