//! docqa: document question answering with page citations
//!
//! Upload a PDF or JSON document together with a list of questions. The
//! document is split into page-aware chunks, embedded, and searched with
//! maximal marginal relevance; an LLM answers each question from the
//! retrieved context and the answer is returned with its source pages.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod processing;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use server::{state::AppState, RagServer};
pub use types::{Answer, AnswerSheet, AnswerStatus, Chunk, Citation, FileType, QuestionBatch};
