//! Answer generation with LLM and citation handling

pub mod citation;
pub mod prompt;
pub mod synthesizer;

pub use citation::{pages_mentioned, select_citations};
pub use prompt::PromptBuilder;
pub use synthesizer::{AnswerSynthesizer, SynthesizedAnswer};
