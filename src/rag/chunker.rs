//! Recursive character splitter for knowledge-base documents.
//!
//! Splits text into windows of at most `chunk_size` bytes (cut only on
//! UTF-8 char boundaries) with `chunk_overlap` bytes shared between
//! consecutive windows. Break points are tried from coarsest to finest:
//! paragraph, line, sentence end, word, then a hard cut.

use serde::{Deserialize, Serialize};

use super::loader::Document;

/// A bounded slice of a source document, the unit of retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// The text content.
    pub content: String,
    /// Source identifier inherited from the document.
    pub source: String,
    /// Ordinal of this chunk within its document, from 0.
    pub position: usize,
    /// Byte offset of this chunk in the trimmed document text.
    pub start_offset: usize,
}

/// Split a document into ordered, overlapping chunks.
///
/// Deterministic: identical input always produces identical output. A
/// document shorter than `chunk_size` yields exactly one chunk; an empty
/// document yields none.
pub fn split(document: &Document, chunk_size: usize, chunk_overlap: usize) -> Vec<Chunk> {
    let text = document.content.trim();
    if text.is_empty() {
        return Vec::new();
    }

    if text.len() <= chunk_size {
        return vec![Chunk {
            content: text.to_string(),
            source: document.source.clone(),
            position: 0,
            start_offset: 0,
        }];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut position = 0;

    while start < text.len() {
        let end = ceil_char_boundary(text, (start + chunk_size).min(text.len()));
        let actual_end = if end < text.len() {
            find_break_point(text, start, end)
        } else {
            end
        };

        chunks.push(Chunk {
            content: text[start..actual_end].to_string(),
            source: document.source.clone(),
            position,
            start_offset: start,
        });
        position += 1;

        if actual_end >= text.len() {
            break;
        }

        let next_start = if actual_end > chunk_overlap {
            floor_char_boundary(text, actual_end - chunk_overlap)
        } else {
            actual_end
        };

        // Always make forward progress, even when the overlap would step
        // back onto or before the current window start.
        start = if next_start <= start {
            actual_end
        } else {
            next_start
        };
    }

    chunks
}

/// Prefer the coarsest structural boundary inside `[start, max_end)`.
fn find_break_point(text: &str, start: usize, max_end: usize) -> usize {
    let segment = &text[start..max_end];

    if let Some(pos) = segment.rfind("\n\n") {
        return start + pos + 2;
    }
    if let Some(pos) = segment.rfind('\n') {
        return start + pos + 1;
    }
    for sentinel in [". ", "? ", "! ", "。", "？", "！"] {
        if let Some(pos) = segment.rfind(sentinel) {
            return start + pos + sentinel.len();
        }
    }
    if let Some(pos) = segment.rfind(' ') {
        return start + pos + 1;
    }
    max_end
}

fn ceil_char_boundary(text: &str, byte_pos: usize) -> usize {
    if byte_pos >= text.len() {
        return text.len();
    }
    let mut pos = byte_pos;
    while pos < text.len() && !text.is_char_boundary(pos) {
        pos += 1;
    }
    pos
}

fn floor_char_boundary(text: &str, byte_pos: usize) -> usize {
    if byte_pos >= text.len() {
        return text.len();
    }
    let mut pos = byte_pos;
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}
