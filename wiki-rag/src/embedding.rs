//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that generates vector embeddings from text input.
///
/// The same provider (and therefore the same model) must be used at indexing
/// time and at query time. [`model_id`](EmbeddingProvider::model_id) is
/// recorded alongside the persisted index so a mismatch can be detected on
/// load.
///
/// The default [`embed_batch`](EmbeddingProvider::embed_batch) implementation
/// calls [`embed`](EmbeddingProvider::embed) once per input; backends that
/// support native batching should override it.
///
/// # Example
///
/// ```rust,ignore
/// use wiki_rag::EmbeddingProvider;
///
/// let embedding = provider.embed("hello world").await?;
/// println!("{} dims from {}", embedding.len(), provider.model_id());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider,
    /// or `None` if it is not known until the first call.
    fn dimensions(&self) -> Option<usize>;

    /// Identifier of the embedding model, persisted with the index.
    fn model_id(&self) -> &str;
}
