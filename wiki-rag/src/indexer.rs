//! Builds a [`VectorIndex`] from documents: chunk → embed.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::chunking::Chunker;
use crate::document::{Chunk, Document};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;

/// Splits documents into chunks and attaches one embedding per chunk.
///
/// Any embedding failure aborts the whole build; a partially embedded index
/// is never returned.
pub struct Indexer {
    chunker: Arc<dyn Chunker>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl Indexer {
    /// Create an indexer that embeds `batch_size` chunks per request.
    pub fn new(
        chunker: Arc<dyn Chunker>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        batch_size: usize,
    ) -> Self {
        Self { chunker, embedding_provider, batch_size: batch_size.max(1) }
    }

    /// Chunk and embed `documents` into a new index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] if the provider fails, returns the
    /// wrong number of vectors, or returns vectors of inconsistent length.
    pub async fn build(&self, documents: &[Document]) -> Result<VectorIndex> {
        let model = self.embedding_provider.model_id().to_string();

        let mut chunks: Vec<Chunk> = Vec::new();
        for document in documents {
            let document_chunks = self.chunker.chunk(document);
            debug!(
                document.id = %document.id,
                chunk_count = document_chunks.len(),
                "chunked document"
            );
            chunks.extend(document_chunks);
        }

        if chunks.is_empty() {
            info!(document_count = documents.len(), "no content to index");
            return Ok(VectorIndex::empty(model));
        }

        for batch in chunks.chunks_mut(self.batch_size) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let embeddings =
                self.embedding_provider.embed_batch(&texts).await.inspect_err(|e| {
                    error!(error = %e, "embedding failed during indexing");
                })?;

            if embeddings.len() != batch.len() {
                return Err(RagError::Embedding {
                    provider: model,
                    message: format!(
                        "requested {} embeddings, received {}",
                        batch.len(),
                        embeddings.len()
                    ),
                });
            }
            for (chunk, embedding) in batch.iter_mut().zip(embeddings) {
                chunk.embedding = embedding;
            }
        }

        let dimensions = chunks[0].embedding.len();
        let index = VectorIndex::new(model, dimensions, chunks)?;
        info!(
            document_count = documents.len(),
            chunk_count = index.len(),
            dimensions,
            "built index"
        );
        Ok(index)
    }
}
