//! Provider abstractions for embeddings and answer generation
//!
//! The pipeline only sees the traits, so the OpenAI client can be swapped for
//! any other backend (or a scripted one in tests).

pub mod embedding;
pub mod llm;
pub mod openai;
pub mod retry;
pub mod usage;

pub use embedding::{EmbeddingProvider, Embeddings};
pub use llm::{Completion, LlmProvider};
pub use openai::OpenAiClient;
pub use retry::RetryPolicy;
pub use usage::TokenUsage;
