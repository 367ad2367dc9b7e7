//! Content fetcher trait for resolving knowledge-base titles into documents.

use async_trait::async_trait;
use tracing::{error, info};

use crate::document::Document;
use crate::error::Result;

/// A source of raw document text, addressed by title.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Resolve one title into a [`Document`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DocumentNotFound`](crate::RagError::DocumentNotFound)
    /// if the source has no such document, or
    /// [`RagError::Fetch`](crate::RagError::Fetch) if the source is unreachable.
    async fn fetch(&self, title: &str) -> Result<Document>;

    /// Resolve every title, in order, once each.
    ///
    /// Fails on the first title that cannot be resolved; no partial result is
    /// returned.
    async fn fetch_all(&self, titles: &[String]) -> Result<Vec<Document>> {
        let mut documents = Vec::with_capacity(titles.len());
        for title in titles {
            let document = self.fetch(title).await.inspect_err(|e| {
                error!(title = %title, error = %e, "failed to fetch document");
            })?;
            documents.push(document);
        }
        info!(document_count = documents.len(), "fetched documents");
        Ok(documents)
    }

    /// Short name used in logs and errors.
    fn name(&self) -> &str;
}
