//! Query-time retrieval: embed the query, rank the index.

use std::sync::Arc;

use tracing::{debug, error};

use crate::config::RetrievalConfig;
use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;

/// Embeds queries and returns the most similar chunks of an index.
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    top_k: usize,
    similarity_threshold: f32,
}

impl Retriever {
    /// Create a retriever using the same provider the index was built with.
    pub fn new(embedding_provider: Arc<dyn EmbeddingProvider>, config: &RetrievalConfig) -> Self {
        Self {
            embedding_provider,
            top_k: config.top_k,
            similarity_threshold: config.similarity_threshold,
        }
    }

    /// The configured number of results.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Return up to `top_k` chunks of `index` ordered by descending similarity to `query`.
    ///
    /// An empty index yields an empty result without contacting the
    /// embedding service.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyQuery`] for a blank query and
    /// [`RagError::Embedding`] if the query cannot be embedded.
    pub async fn retrieve(&self, index: &VectorIndex, query: &str) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(RagError::EmptyQuery);
        }
        if index.is_empty() {
            debug!("index is empty, nothing to retrieve");
            return Ok(Vec::new());
        }

        let query_embedding = self.embedding_provider.embed(query).await.inspect_err(|e| {
            error!(error = %e, "embedding failed during query");
        })?;
        if query_embedding.len() != index.dimensions() {
            return Err(RagError::Embedding {
                provider: self.embedding_provider.model_id().to_string(),
                message: format!(
                    "query embedding has {} dimensions, index has {}",
                    query_embedding.len(),
                    index.dimensions()
                ),
            });
        }

        let threshold = self.similarity_threshold;
        let results: Vec<SearchResult> = index
            .search(&query_embedding, self.top_k)
            .into_iter()
            .filter(|r| r.score >= threshold)
            .collect();

        debug!(result_count = results.len(), top_k = self.top_k, "retrieved chunks");
        Ok(results)
    }
}
