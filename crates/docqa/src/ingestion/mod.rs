//! Document ingestion: PDF/JSON loading, chunking and indexing

mod chunker;
mod parser;
mod processor;
pub mod tokens;

pub use chunker::TextChunker;
pub use parser::{source_name, FileParser, ParsedDocument, DEFAULT_SOURCE};
pub use processor::{IngestPipeline, KnowledgeBase};
pub use tokens::{estimate_tokens, EstimatingTokenCounter, TokenCounter};
