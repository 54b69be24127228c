//! Document, page segment and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported document types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document, one segment per page
    Pdf,
    /// JSON document, pretty-printed into a single segment
    Json,
}

impl FileType {
    /// Detect file type from an extension (with or without the leading dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Detect file type from a filename
    pub fn from_filename(filename: &str) -> Option<Self> {
        Self::from_extension(&extension_of(filename))
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Json => "JSON",
        }
    }
}

/// Lower-cased extension of a filename including the dot, or an empty string
pub fn extension_of(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

/// Text of one page (or of the whole document when it has no pages)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSegment {
    /// Original uploaded filename
    pub source: String,
    /// Zero-based page index, `None` for unpaginated documents
    pub page: Option<u32>,
    /// Extracted text
    pub text: String,
}

impl PageSegment {
    /// Create a segment
    pub fn new(source: impl Into<String>, page: Option<u32>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            page,
            text: text.into(),
        }
    }
}

/// A token-bounded span of a page, the unit of embedding and retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Position of the chunk within its document
    pub index: u32,
    /// Original uploaded filename
    pub source: String,
    /// Page the chunk was cut from
    pub page: Option<u32>,
    /// Text content
    pub text: String,
    /// Token count of `text`
    pub token_count: usize,
    /// Embedding vector, empty until the chunk is embedded
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Create a new chunk without an embedding
    pub fn new(
        index: u32,
        source: String,
        page: Option<u32>,
        text: String,
        token_count: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            index,
            source,
            page,
            text,
            token_count,
            embedding: Vec::new(),
        }
    }

    /// Whether the chunk carries an embedding
    pub fn is_embedded(&self) -> bool {
        !self.embedding.is_empty()
    }
}
