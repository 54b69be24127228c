//! PDF and JSON document loader

use sha2::{Digest, Sha256};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::document::extension_of;
use crate::types::{FileType, PageSegment};

/// Source name used when the upload carries no filename
pub const DEFAULT_SOURCE: &str = "document";

const CORRUPT_PDF: &str = "Corrupt or unreadable file.";
const CORRUPT_JSON: &str = "Corrupt JSON document.";

/// Upper bound for pdf-extract before falling back to lopdf
const PDF_EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Parsed document split at page boundaries
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// File type
    pub file_type: FileType,
    /// SHA-256 of the uploaded bytes
    pub content_hash: String,
    /// Total pages (PDF only)
    pub total_pages: Option<u32>,
    /// One segment per page, or a single segment for JSON
    pub segments: Vec<PageSegment>,
}

impl ParsedDocument {
    /// Total characters across all segments
    pub fn char_count(&self) -> usize {
        self.segments.iter().map(|s| s.text.chars().count()).sum()
    }
}

/// Document loader for the supported upload types
pub struct FileParser;

impl FileParser {
    /// Parse an upload based on its filename extension
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let file_type = FileType::from_filename(filename)
            .ok_or_else(|| Error::UnsupportedFileType(extension_of(filename)))?;

        let source = source_name(filename);
        let parsed = match file_type {
            FileType::Pdf => Self::parse_pdf(&source, data)?,
            FileType::Json => Self::parse_json(&source, data)?,
        };

        if parsed.segments.iter().all(|s| s.text.trim().is_empty()) {
            return Err(Error::EmptyDocument);
        }

        tracing::debug!(
            source = %source,
            file_type = file_type.display_name(),
            segments = parsed.segments.len(),
            chars = parsed.char_count(),
            "document parsed"
        );

        Ok(parsed)
    }

    /// Parse a PDF into one segment per page, numbered from 0
    fn parse_pdf(source: &str, data: &[u8]) -> Result<ParsedDocument> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| {
            tracing::warn!(source = %source, error = %e, "PDF failed to load");
            Error::file_parse(source, CORRUPT_PDF)
        })?;
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();

        let pages = match Self::extract_pages_with_timeout(data) {
            Some(pages) if pages.len() == page_numbers.len() => pages,
            Some(pages) => {
                tracing::warn!(
                    extracted = pages.len(),
                    expected = page_numbers.len(),
                    "pdf-extract page count mismatch, using lopdf"
                );
                Self::extract_pages_fallback(&doc, &page_numbers)
            }
            None => Self::extract_pages_fallback(&doc, &page_numbers),
        };

        let segments = pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| PageSegment::new(source, Some(i as u32), cleanup_pdf_text(&text)))
            .collect();

        Ok(ParsedDocument {
            file_type: FileType::Pdf,
            content_hash: hash_bytes(data),
            total_pages: Some(page_numbers.len() as u32),
            segments,
        })
    }

    /// Run pdf-extract on its own thread so a pathological font cannot hang the request
    fn extract_pages_with_timeout(data: &[u8]) -> Option<Vec<String>> {
        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem_by_pages(&data_vec);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(PDF_EXTRACT_TIMEOUT) {
            Ok(Ok(pages)) => {
                let _ = handle.join();
                Some(pages)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                tracing::warn!(error = %e, "pdf-extract failed, trying fallback");
                None
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // The thread cannot be killed; it is left to finish on its own
                tracing::error!(
                    timeout_secs = PDF_EXTRACT_TIMEOUT.as_secs(),
                    "pdf-extract timed out, trying fallback"
                );
                None
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::error!("pdf-extract thread panicked, trying fallback");
                None
            }
        }
    }

    /// Per-page extraction with lopdf; unreadable pages become empty text
    fn extract_pages_fallback(doc: &lopdf::Document, page_numbers: &[u32]) -> Vec<String> {
        page_numbers
            .iter()
            .map(|&page| match doc.extract_text(&[page]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!(page, error = %e, "lopdf could not extract page");
                    String::new()
                }
            })
            .collect()
    }

    /// Pretty-print a JSON document into a single unpaginated segment
    fn parse_json(source: &str, data: &[u8]) -> Result<ParsedDocument> {
        let value: serde_json::Value =
            serde_json::from_slice(data).map_err(|_| Error::file_parse(source, CORRUPT_JSON))?;
        let text = serde_json::to_string_pretty(&value)?;

        Ok(ParsedDocument {
            file_type: FileType::Json,
            content_hash: hash_bytes(data),
            total_pages: None,
            segments: vec![PageSegment::new(source, None, text)],
        })
    }
}

/// Citation source for an upload: its filename, or a placeholder when absent
pub fn source_name(filename: &str) -> String {
    let name = filename.trim();
    if name.is_empty() {
        DEFAULT_SOURCE.to_string()
    } else {
        name.to_string()
    }
}

/// Normalize extracted PDF text: drop NULs, expand ligatures, trim line ends
fn cleanup_pdf_text(text: &str) -> String {
    let text = text
        .replace('\0', "")
        .replace('\u{00A0}', " ")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl");

    text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Hash raw upload bytes
fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
