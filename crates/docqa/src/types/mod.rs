//! Core types for the Q&A service

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, FileType, PageSegment};
pub use query::{Question, QuestionBatch};
pub use response::{Answer, AnswerSheet, AnswerStatus, Citation};
