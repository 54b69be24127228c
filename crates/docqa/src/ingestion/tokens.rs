//! Token counting for chunk sizing

/// Counts tokens in a piece of text
pub trait TokenCounter: Send + Sync {
    /// Number of tokens in `text`
    fn count(&self, text: &str) -> usize;
}

/// Estimates tokens with the chars/4 heuristic, rounded up
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatingTokenCounter;

impl TokenCounter for EstimatingTokenCounter {
    fn count(&self, text: &str) -> usize {
        estimate_tokens(text)
    }
}

/// Estimate token count using chars/4, rounded up so any text is at least one token
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}
