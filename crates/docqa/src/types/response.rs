//! Response types for the `/answer` endpoint

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Sentence the model uses when the document holds no answer
pub const NOT_FOUND_ANSWER: &str = "Not found in the provided document.";

/// Answer returned when a question fails after retries
pub const ERROR_ANSWER: &str = "Error: Service unavailable for this query.";

/// Citation pointing at a page of the uploaded document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Citation {
    /// Original uploaded filename
    pub source: String,
    /// Page number, `null` for unpaginated documents
    pub page: Option<u32>,
}

impl Citation {
    /// Create a citation
    pub fn new(source: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            source: source.into(),
            page,
        }
    }
}

/// How completely the document answered a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    /// Fully answered
    Found,
    /// Answered with a `Missing:` list
    Partial,
    /// The document does not contain the answer
    NotFound,
    /// The question failed upstream
    Error,
}

impl AnswerStatus {
    /// Classify a model answer
    pub fn classify(answer: &str) -> Self {
        let answer = answer.trim();
        if answer.is_empty() || answer.starts_with(NOT_FOUND_ANSWER) {
            return Self::NotFound;
        }
        if answer
            .lines()
            .any(|line| line.trim_start().starts_with("Missing:"))
        {
            return Self::Partial;
        }
        Self::Found
    }
}

/// Answer to one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Answer text
    pub answer: String,
    /// Up to four supporting citations
    pub citations: Vec<Citation>,
    /// Answer status
    pub status: AnswerStatus,
}

impl Answer {
    /// Build an answer from model output; empty output becomes the not-found sentence
    pub fn from_model(text: &str, citations: Vec<Citation>) -> Self {
        let text = text.trim();
        let status = AnswerStatus::classify(text);
        let answer = if text.is_empty() {
            NOT_FOUND_ANSWER.to_string()
        } else {
            text.to_string()
        };
        Self {
            answer,
            citations,
            status,
        }
    }

    /// Answer for a question that failed upstream
    pub fn error() -> Self {
        Self {
            answer: ERROR_ANSWER.to_string(),
            citations: Vec::new(),
            status: AnswerStatus::Error,
        }
    }
}

/// Answers keyed by question text, serialized as a JSON object in question order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerSheet {
    entries: Vec<(String, Answer)>,
}

impl AnswerSheet {
    /// Create an empty sheet
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an answer
    pub fn push(&mut self, question: impl Into<String>, answer: Answer) {
        self.entries.push((question.into(), answer));
    }

    /// Look up the answer to a question
    pub fn get(&self, question: &str) -> Option<&Answer> {
        self.entries
            .iter()
            .find(|(q, _)| q == question)
            .map(|(_, a)| a)
    }

    /// Iterate in question order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Answer)> {
        self.entries.iter().map(|(q, a)| (q.as_str(), a))
    }

    /// Number of answers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the sheet is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count answers with the given status
    pub fn count_status(&self, status: AnswerStatus) -> usize {
        self.entries.iter().filter(|(_, a)| a.status == status).count()
    }
}

impl FromIterator<(String, Answer)> for AnswerSheet {
    fn from_iter<I: IntoIterator<Item = (String, Answer)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Serialize for AnswerSheet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (question, answer) in &self.entries {
            map.serialize_entry(question, answer)?;
        }
        map.end()
    }
}
