//! Question batch parsing

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::error::{Error, Result};

const INVALID_JSON: &str =
    "Invalid questions JSON. Provide a JSON array or {\"questions\": [...]} object.";
const NOT_STRINGS: &str = "Questions must be a list of strings.";
const NO_QUESTIONS: &str = "No questions provided.";

fn too_many(max_questions: usize) -> Error {
    Error::InvalidQuestions(format!("Too many questions. Limit is {}.", max_questions))
}

/// A question and its position in the uploaded batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Zero-based position in the batch
    pub position: usize,
    /// Trimmed question text
    pub text: String,
}

/// Ordered, de-duplicated questions from one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionBatch {
    questions: Vec<Question>,
}

impl QuestionBatch {
    /// Parse the contents of a questions file.
    ///
    /// Accepts a JSON array of strings or an object with a `questions` array.
    /// Strings are trimmed, blank ones dropped, and repeated questions keep only
    /// their first position.
    pub fn parse(data: &[u8], max_questions: usize) -> Result<Self> {
        let value: Value = serde_json::from_slice(data)
            .map_err(|_| Error::InvalidQuestions(INVALID_JSON.to_string()))?;

        let items = match value {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("questions") {
                Some(Value::Array(items)) => items,
                Some(_) => return Err(Error::InvalidQuestions(NOT_STRINGS.to_string())),
                None => Vec::new(),
            },
            _ => return Err(Error::InvalidQuestions(NOT_STRINGS.to_string())),
        };

        let mut texts = Vec::with_capacity(items.len());
        for item in &items {
            match item {
                Value::String(s) => texts.push(s.trim()),
                _ => return Err(Error::InvalidQuestions(NOT_STRINGS.to_string())),
            }
        }

        let mut seen = HashSet::new();
        let mut questions: Vec<Question> = Vec::new();
        for text in texts {
            if text.is_empty() || !seen.insert(text) {
                continue;
            }
            if questions.len() == max_questions {
                return Err(too_many(max_questions));
            }
            questions.push(Question {
                position: questions.len(),
                text: text.to_string(),
            });
        }

        if questions.is_empty() {
            return Err(Error::InvalidQuestions(NO_QUESTIONS.to_string()));
        }

        Ok(Self { questions })
    }

    /// Questions in batch order
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Number of questions
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Consume the batch
    pub fn into_questions(self) -> Vec<Question> {
        self.questions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: Error) -> String {
        match err {
            Error::InvalidQuestions(msg) => msg,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_array() {
        let batch = QuestionBatch::parse(br#"["  What is X? ", "Who owns Y?"]"#, 50).unwrap();
        let texts: Vec<&str> = batch.questions().iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts, vec!["What is X?", "Who owns Y?"]);
        assert_eq!(batch.questions()[1].position, 1);
    }

    #[test]
    fn test_parse_object() {
        let batch = QuestionBatch::parse(br#"{"questions": ["Q1", "Q2"]}"#, 50).unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_blank_and_duplicate_questions_are_dropped() {
        let batch = QuestionBatch::parse(br#"["Q1", "", "   ", "Q2", " Q1"]"#, 50).unwrap();
        let texts: Vec<&str> = batch.questions().iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts, vec!["Q1", "Q2"]);
        assert_eq!(batch.questions()[1].position, 1);
    }

    #[test]
    fn test_invalid_json() {
        let err = QuestionBatch::parse(b"{not valid json", 50).unwrap_err();
        assert!(message(err).starts_with("Invalid questions JSON"));
    }

    #[test]
    fn test_non_string_questions() {
        let err = QuestionBatch::parse(b"[1, 2, 3]", 50).unwrap_err();
        assert_eq!(message(err), NOT_STRINGS);

        let err = QuestionBatch::parse(br#"{"questions": "Q1"}"#, 50).unwrap_err();
        assert_eq!(message(err), NOT_STRINGS);

        let err = QuestionBatch::parse(br#""just a string""#, 50).unwrap_err();
        assert_eq!(message(err), NOT_STRINGS);
    }

    #[test]
    fn test_no_questions() {
        let err = QuestionBatch::parse(b"[]", 50).unwrap_err();
        assert_eq!(message(err), NO_QUESTIONS);

        let err = QuestionBatch::parse(br#"{"other": []}"#, 50).unwrap_err();
        assert_eq!(message(err), NO_QUESTIONS);
    }

    #[test]
    fn test_too_many_questions() {
        let questions: Vec<String> = (0..51).map(|i| format!("Q{i}")).collect();
        let data = serde_json::to_vec(&questions).unwrap();
        let err = QuestionBatch::parse(&data, 50).unwrap_err();
        assert_eq!(message(err), "Too many questions. Limit is 50.");

        assert_eq!(QuestionBatch::parse(&data, 51).unwrap().len(), 51);
    }

    #[test]
    fn test_large_batch_is_rejected_quickly() {
        let questions: Vec<String> = (0..100_000).map(|i| format!("Q{i}")).collect();
        let data = serde_json::to_vec(&questions).unwrap();
        assert!(data.len() < 1024 * 1024);

        let start = std::time::Instant::now();
        let err = QuestionBatch::parse(&data, 50).unwrap_err();
        assert_eq!(message(err), "Too many questions. Limit is 50.");
        assert!(start.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_repeats_do_not_count_toward_limit() {
        let mut questions: Vec<String> = (0..50).map(|i| format!("Q{i}")).collect();
        questions.extend((0..50).map(|i| format!(" Q{i} ")));
        let data = serde_json::to_vec(&questions).unwrap();

        let batch = QuestionBatch::parse(&data, 50).unwrap();
        assert_eq!(batch.len(), 50);
        assert_eq!(batch.questions()[49].text, "Q49");
    }
}
