//! The searchable vector index.
//!
//! [`VectorIndex`] holds every embedded [`Chunk`] of the knowledge base plus
//! the identity of the model that produced the embeddings. Search is an
//! exhaustive cosine-similarity scan, which is plenty for a few dozen pages.

use std::cmp::Ordering;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};

/// An immutable collection of embedded chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    embedding_model: String,
    dimensions: usize,
    chunks: Vec<Chunk>,
}

impl VectorIndex {
    /// Create an index, checking that every chunk has an embedding of `dimensions` values.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] if a chunk has no embedding or one of a
    /// different length.
    pub fn new(
        embedding_model: impl Into<String>,
        dimensions: usize,
        chunks: Vec<Chunk>,
    ) -> Result<Self> {
        let embedding_model = embedding_model.into();
        let malformed = chunks.iter().find(|c| dimensions == 0 || c.embedding.len() != dimensions);
        if let Some(bad) = malformed {
            return Err(RagError::Embedding {
                provider: embedding_model,
                message: format!(
                    "chunk '{}' has {} dimensions, expected {dimensions}",
                    bad.id,
                    bad.embedding.len()
                ),
            });
        }
        Ok(Self { embedding_model, dimensions, chunks })
    }

    /// An index with no chunks.
    pub fn empty(embedding_model: impl Into<String>) -> Self {
        Self { embedding_model: embedding_model.into(), dimensions: 0, chunks: Vec::new() }
    }

    /// The embedding model used to build this index.
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Dimensionality of every embedding in the index (0 for an empty index).
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// All chunks, in insertion order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of distinct source documents.
    pub fn document_count(&self) -> usize {
        let mut ids: Vec<&str> = self.chunks.iter().map(|c| c.document_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    /// Return the `top_k` chunks most similar to `embedding`.
    ///
    /// Results are ordered by descending cosine similarity; equal scores keep
    /// insertion order. The result holds `min(top_k, len())` entries.
    pub fn search(&self, embedding: &[f32], top_k: usize) -> Vec<SearchResult> {
        let mut scored: Vec<SearchResult> = self
            .chunks
            .iter()
            .map(|chunk| SearchResult {
                chunk: chunk.clone(),
                score: cosine_similarity(&chunk.embedding, embedding),
            })
            .collect();

        // stable sort: ties keep insertion order
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);
        scored
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude, the lengths differ, or the
/// result is not a finite number.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let similarity = dot / (norm_a * norm_b);
    if similarity.is_finite() { similarity } else { 0.0 }
}
