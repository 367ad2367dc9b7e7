//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`] splits by character count with configurable overlap
//! - [`RecursiveChunker`] splits hierarchically by paragraphs, sentences, then words
//!
//! Sizes are measured in characters, never bytes, so multi-byte text such as
//! accented or CJK page content is never cut inside a code point.

use std::collections::VecDeque;

use crate::document::{Chunk, Document};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata but no embeddings.
/// Embeddings are attached later by the [`Indexer`](crate::Indexer).
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace text.
    /// Each returned chunk has an empty embedding vector.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text into fixed-size chunks by character count with configurable overlap.
///
/// Chunk IDs are generated as `{document_id}_{chunk_index}`. Each chunk inherits
/// the parent document's metadata plus a `chunk_index` field.
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let pieces = split_by_size(&document.text, self.chunk_size, self.chunk_overlap);
        into_chunks(document, pieces)
    }
}

/// Splits text hierarchically: paragraphs → sentences → words.
///
/// First splits by paragraph separators (`\n\n`, then `\n`). Segments that
/// exceed `chunk_size` are split by sentence boundaries (`. `, `! `, `? `), then
/// by word boundaries, and finally by characters. Segments are merged back
/// into chunks of at most `chunk_size` characters; each chunk starts with
/// trailing segments of the previous one totalling at most `chunk_overlap`
/// characters.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: maximum number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

const SEPARATORS: [&str; 6] = ["\n\n", "\n", ". ", "! ", "? ", " "];

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let pieces =
            split_and_merge(&document.text, self.chunk_size, self.chunk_overlap, &SEPARATORS);
        into_chunks(document, pieces)
    }
}

fn into_chunks(document: &Document, pieces: Vec<String>) -> Vec<Chunk> {
    pieces
        .into_iter()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .enumerate()
        .map(|(i, text)| {
            let mut metadata = document.metadata.clone();
            metadata.insert("chunk_index".to_string(), i.to_string());
            Chunk {
                id: format!("{}_{i}", document.id),
                text,
                embedding: Vec::new(),
                metadata,
                document_id: document.id.clone(),
                document_title: document.title.clone(),
            }
        })
        .collect()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Break text into pieces of at most `chunk_size` characters, preferring the
/// earliest separator in `separators` and falling back to the next one for
/// pieces that are still too long.
fn split_recursive(text: &str, chunk_size: usize, separators: &[&str]) -> Vec<String> {
    if char_len(text) <= chunk_size {
        return vec![text.to_string()];
    }
    let Some((separator, remaining_separators)) = separators.split_first() else {
        return split_by_size(text, chunk_size, 0);
    };

    let mut pieces = Vec::new();
    for segment in split_keeping_separator(text, separator) {
        if char_len(segment) > chunk_size {
            pieces.extend(split_recursive(segment, chunk_size, remaining_separators));
        } else {
            pieces.push(segment.to_string());
        }
    }
    pieces
}

fn split_and_merge(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }
    merge_pieces(split_recursive(text, chunk_size, separators), chunk_size, chunk_overlap)
}

/// Greedily pack pieces (each at most `chunk_size` characters) into chunks,
/// carrying trailing pieces forward as overlap.
fn merge_pieces(pieces: Vec<String>, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<(String, usize)> = VecDeque::new();
    let mut window_len = 0;

    for piece in pieces {
        let piece_len = char_len(&piece);
        if window_len + piece_len > chunk_size && !window.is_empty() {
            chunks.push(window.iter().map(|(text, _)| text.as_str()).collect::<String>());
            while window_len > chunk_overlap || window_len + piece_len > chunk_size {
                let Some((_, len)) = window.pop_front() else { break };
                window_len -= len;
            }
        }
        window_len += piece_len;
        window.push_back((piece, piece_len));
    }

    if !window.is_empty() {
        chunks.push(window.into_iter().map(|(text, _)| text).collect::<String>());
    }

    chunks
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// Character-based splitting with overlap.
fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let boundaries: Vec<usize> =
        text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let total_chars = boundaries.len() - 1;
    let step = chunk_size.saturating_sub(chunk_overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < total_chars {
        let end = (start + chunk_size).min(total_chars);
        chunks.push(text[boundaries[start]..boundaries[end]].to_string());
        if end == total_chars {
            break;
        }
        start += step;
    }

    chunks
}
