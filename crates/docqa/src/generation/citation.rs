//! Citation selection from retrieved chunks and the pages an answer cites

use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

use crate::types::{Chunk, Citation};

fn page_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\bpage\s*=?\s*(\d+)\b").expect("Invalid regex"))
}

/// Page numbers mentioned in an answer, e.g. `page 48`, `(page 48)`, `page=48`
pub fn pages_mentioned(answer: &str) -> BTreeSet<u32> {
    page_pattern()
        .captures_iter(answer)
        .filter_map(|cap| cap.get(1)?.as_str().parse().ok())
        .collect()
}

/// Choose up to `max` citations for an answer from chunks in rank order.
///
/// When the answer mentions pages, chunks on other known pages are skipped.
/// Citations are unique by (source, page). If filtering leaves nothing, the
/// first `max` unique retrieved pages are used instead.
pub fn select_citations<'a, I>(answer: &str, retrieved: I, max: usize) -> Vec<Citation>
where
    I: IntoIterator<Item = &'a Chunk>,
    I::IntoIter: Clone,
{
    let retrieved = retrieved.into_iter();
    let pages = pages_mentioned(answer);

    let cited = unique_citations(
        retrieved.clone().filter(|chunk| match chunk.page {
            Some(page) if !pages.is_empty() => pages.contains(&page),
            _ => true,
        }),
        max,
    );
    if !cited.is_empty() {
        return cited;
    }

    unique_citations(retrieved, max)
}

fn unique_citations<'a>(chunks: impl Iterator<Item = &'a Chunk>, max: usize) -> Vec<Citation> {
    let mut seen = HashSet::new();
    let mut citations = Vec::new();

    for chunk in chunks {
        if citations.len() >= max {
            break;
        }
        let citation = Citation::new(chunk.source.clone(), chunk.page);
        if seen.insert(citation.clone()) {
            citations.push(citation);
        }
    }

    citations
}
