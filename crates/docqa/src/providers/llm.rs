//! LLM provider trait for generating answers

use async_trait::async_trait;

use super::usage::TokenUsage;
use crate::error::Result;

/// Text generated by the model
#[derive(Debug, Clone, Default)]
pub struct Completion {
    /// Model output
    pub text: String,
    /// Tokens billed for the call
    pub usage: TokenUsage,
}

/// Trait for LLM-based answer generation
///
/// Implementations:
/// - `OpenAiClient`: OpenAI compatible `/chat/completions` endpoint
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Answer `question` from the formatted document `context`
    async fn generate_answer(&self, question: &str, context: &str) -> Result<Completion>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
