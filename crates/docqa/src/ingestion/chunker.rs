//! Recursive text chunking with page tracking
//!
//! Text is split on the coarsest separator that occurs in it (paragraphs,
//! then lines, then words, then single characters). Pieces are merged back
//! greedily up to the chunk size, and each new chunk starts with the tail of
//! the previous one up to the overlap size.

use std::sync::Arc;

use unicode_segmentation::UnicodeSegmentation;

use super::tokens::{EstimatingTokenCounter, TokenCounter};
use crate::error::{Error, Result};
use crate::types::{Chunk, PageSegment};

/// Separators tried in order; the empty separator splits into graphemes
const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Token-bounded text chunker
#[derive(Clone)]
pub struct TextChunker {
    /// Maximum chunk size in tokens
    chunk_size: usize,
    /// Tokens carried over from the previous chunk
    chunk_overlap: usize,
    counter: Arc<dyn TokenCounter>,
}

impl std::fmt::Debug for TextChunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextChunker")
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .finish()
    }
}

impl TextChunker {
    /// Create a chunker using the chars/4 token estimate
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        Self::with_counter(chunk_size, chunk_overlap, Arc::new(EstimatingTokenCounter))
    }

    /// Create a chunker with a custom token counter
    pub fn with_counter(
        chunk_size: usize,
        chunk_overlap: usize,
        counter: Arc<dyn TokenCounter>,
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk_size must be positive".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            counter,
        })
    }

    /// Maximum chunk size in tokens
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Chunk every segment; chunks never cross a page boundary
    pub fn chunk_segments(&self, segments: &[PageSegment]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut index = 0u32;

        for segment in segments {
            for text in self.split_text(&segment.text) {
                let token_count = self.counter.count(&text);
                chunks.push(Chunk::new(
                    index,
                    segment.source.clone(),
                    segment.page,
                    text,
                    token_count,
                ));
                index += 1;
            }
        }

        chunks
    }

    /// Split text into trimmed, non-empty chunks of at most `chunk_size` tokens
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        // The empty separator always matches, so a separator is always found
        let position = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).copied().unwrap_or("");
        let remaining = separators.get(position + 1..).unwrap_or(&[]);

        let pieces: Vec<&str> = if separator.is_empty() {
            text.graphemes(true).collect()
        } else {
            text.split_inclusive(separator).collect()
        };

        let mut output = Vec::new();
        let mut fitting: Vec<Piece> = Vec::new();
        let mut offset = 0usize;

        for piece in pieces {
            let start = offset;
            offset += piece.len();

            let tokens = self.counter.count(piece);
            if tokens <= self.chunk_size {
                fitting.push(Piece {
                    start,
                    end: offset,
                    tokens,
                });
                continue;
            }

            if !fitting.is_empty() {
                output.extend(self.merge(text, &fitting));
                fitting.clear();
            }
            if remaining.is_empty() {
                push_trimmed(&mut output, piece);
            } else {
                output.extend(self.split_recursive(piece, remaining));
            }
        }

        if !fitting.is_empty() {
            output.extend(self.merge(text, &fitting));
        }

        output
    }

    /// Greedily merge adjacent pieces of `text` into chunks, carrying an overlap
    /// window forward.
    ///
    /// The window is always the contiguous span `pieces[first..=i]`, so it is
    /// measured as one text. The running sum of piece counts is only an upper
    /// bound and is replaced by an exact count whenever it crosses the limit.
    fn merge(&self, text: &str, pieces: &[Piece]) -> Vec<String> {
        let mut output = Vec::new();
        let mut first = 0usize;
        let mut total = 0usize;

        for (i, piece) in pieces.iter().enumerate() {
            if first == i || total + piece.tokens <= self.chunk_size {
                total += piece.tokens;
                continue;
            }

            let start = pieces[first].start;
            total = self.counter.count(&text[start..piece.end]);
            if total <= self.chunk_size {
                continue;
            }

            let end = pieces[i - 1].end;
            push_trimmed(&mut output, &text[start..end]);

            first = self.overlap_start(text, pieces, first, i);
            total = if first == i {
                piece.tokens
            } else {
                self.counter.count(&text[pieces[first].start..piece.end])
            };
        }

        if let (Some(window), Some(last)) = (pieces.get(first), pieces.last()) {
            push_trimmed(&mut output, &text[window.start..last.end]);
        }

        output
    }

    /// First piece of the next chunk after closing `pieces[first..next]`: the
    /// earliest piece whose tail fits the overlap and leaves room for `next`
    fn overlap_start(&self, text: &str, pieces: &[Piece], first: usize, next: usize) -> usize {
        let closed_end = pieces[next - 1].end;
        let next_end = pieces[next].end;
        let keeps = |j: usize| {
            let start = pieces[j].start;
            self.counter.count(&text[start..closed_end]) <= self.chunk_overlap
                && self.counter.count(&text[start..next_end]) <= self.chunk_size
        };

        // Both counts shrink as the start moves right
        let (mut lo, mut hi) = (first, next);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if keeps(mid) {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }
}

/// Byte span of one split piece within the text being merged
#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
    tokens: usize,
}

fn push_trimmed(output: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        output.push(trimmed.to_string());
    }
}
