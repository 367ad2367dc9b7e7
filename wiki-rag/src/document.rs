//! Data types for documents, chunks, search results and answers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key holding the source page title.
pub const PAGE_TITLE_KEY: &str = "page_title";

/// One fetched page, before chunking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Stable page identifier (the Wikipedia page id when known).
    pub id: String,
    /// Human-readable title, used when citing sources.
    pub title: String,
    /// Plain-text page body.
    pub text: String,
    /// String metadata; always contains `page_title`.
    pub metadata: HashMap<String, String>,
    /// Canonical page URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document whose metadata records its title.
    pub fn new(id: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        let title = title.into();
        let metadata = HashMap::from([(PAGE_TITLE_KEY.to_string(), title.clone())]);
        Self { id: id.into(), title, text: text.into(), metadata, source_uri: None }
    }

    /// Attach a source URI.
    pub fn with_source_uri(mut self, uri: impl Into<String>) -> Self {
        self.source_uri = Some(uri.into());
        self
    }
}

/// A slice of a page's text plus its embedding, the unit of retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// `{document_id}_{index}`.
    pub id: String,
    /// Chunk text, trimmed.
    pub text: String,
    /// Empty until the indexer attaches one.
    pub embedding: Vec<f32>,
    /// Page metadata plus `chunk_index`.
    pub metadata: HashMap<String, String>,
    /// Id of the page this chunk was cut from.
    pub document_id: String,
    /// Title of that page, shown when citing the chunk.
    pub document_title: String,
}

/// A retrieved [`Chunk`] and its cosine similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    /// Higher is more relevant.
    pub score: f32,
}

impl SearchResult {
    /// The title of the page this result was cut from.
    pub fn title(&self) -> &str {
        &self.chunk.document_title
    }
}

/// A generated answer together with the passages it was conditioned on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// The generated answer text.
    pub text: String,
    /// Retrieved passages, ordered by descending score.
    pub sources: Vec<SearchResult>,
}
