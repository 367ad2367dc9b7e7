//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] resolves the one start-up branch (load the persisted
//! index, or fetch → chunk → embed → save a new one) and hands out a
//! [`QueryEngine`] that answers questions against that index.
//!
//! # Example
//!
//! ```rust,ignore
//! use wiki_rag::{RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .fetcher(Arc::new(wikipedia))
//!     .embedding_provider(Arc::new(embedder))
//!     .generator(Arc::new(generator))
//!     .build()?;
//!
//! let engine = pipeline.query_engine().await?;
//! let answer = engine.query("What is the history of Mazda?").await?;
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::{OllamaConfig, RagConfig};
use crate::document::{Answer, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::fetcher::ContentFetcher;
use crate::generator::AnswerGenerator;
use crate::index::VectorIndex;
use crate::indexer::Indexer;
use crate::ollama::OllamaClient;
use crate::prompt::build_qa_prompt;
use crate::retriever::Retriever;
use crate::store::{FsIndexStore, IndexStore};

/// Where the index handed out by [`RagPipeline::load_or_build`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrigin {
    /// Restored from the index store.
    Loaded,
    /// Fetched, embedded and saved during this call.
    Built,
}

impl fmt::Display for IndexOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexOrigin::Loaded => write!(f, "loaded"),
            IndexOrigin::Built => write!(f, "built"),
        }
    }
}

/// The RAG pipeline orchestrator.
///
/// Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    fetcher: Arc<dyn ContentFetcher>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn AnswerGenerator>,
    chunker: Arc<dyn Chunker>,
    store: Arc<dyn IndexStore>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Load the persisted index, or build and save one if none exists.
    ///
    /// On the load path neither the fetcher nor the embedding service is
    /// contacted.
    ///
    /// # Errors
    ///
    /// - [`RagError::IndexCorrupt`] if a persisted index cannot be read back;
    /// - [`RagError::ModelMismatch`] if it was built with another embedding model;
    /// - any fetch, embedding or store error on the build path.
    pub async fn load_or_build(&self) -> Result<(VectorIndex, IndexOrigin)> {
        if let Some(index) = self.store.load().await? {
            let configured = self.embedding_provider.model_id();
            if index.embedding_model() != configured {
                error!(
                    stored = index.embedding_model(),
                    configured, "persisted index was built with a different embedding model"
                );
                return Err(RagError::ModelMismatch {
                    stored: index.embedding_model().to_string(),
                    configured: configured.to_string(),
                });
            }
            info!(chunk_count = index.len(), "using persisted index");
            return Ok((index, IndexOrigin::Loaded));
        }

        let index = self.rebuild().await?;
        Ok((index, IndexOrigin::Built))
    }

    /// Fetch every configured page, build a fresh index and save it,
    /// replacing any persisted one.
    pub async fn rebuild(&self) -> Result<VectorIndex> {
        let pages = &self.config.wikipedia.pages;
        info!(page_count = pages.len(), source = self.fetcher.name(), "building index");

        let documents = self.fetcher.fetch_all(pages).await?;
        let indexer = Indexer::new(
            Arc::clone(&self.chunker),
            Arc::clone(&self.embedding_provider),
            self.config.chunking.embed_batch_size,
        );
        let index = indexer.build(&documents).await?;
        if index.is_empty() {
            warn!(page_count = pages.len(), "fetched pages contained no text");
        }

        self.store.save(&index).await?;
        Ok(index)
    }

    /// Wrap an index in a [`QueryEngine`] using this pipeline's components.
    pub fn query_engine_for(&self, index: VectorIndex) -> QueryEngine {
        QueryEngine {
            index: Arc::new(index),
            retriever: Arc::new(Retriever::new(
                Arc::clone(&self.embedding_provider),
                &self.config.retrieval,
            )),
            generator: Arc::clone(&self.generator),
        }
    }

    /// [`load_or_build`](Self::load_or_build), then wrap the index in a [`QueryEngine`].
    pub async fn query_engine(&self) -> Result<QueryEngine> {
        let (index, origin) = self.load_or_build().await?;
        info!(%origin, chunk_count = index.len(), "query engine ready");
        Ok(self.query_engine_for(index))
    }
}

/// Check that the Ollama daemon is reachable and both configured models are pulled.
///
/// # Errors
///
/// Returns [`RagError::ModelUnavailable`] naming the first missing model,
/// with a hint on how to fix it.
pub async fn check_services(client: &OllamaClient, config: &OllamaConfig) -> Result<()> {
    client.ensure_model(&config.embedding_model).await?;
    client.ensure_model(&config.llm_model).await?;
    info!(
        base_url = client.base_url(),
        llm_model = %config.llm_model,
        embedding_model = %config.embedding_model,
        "Ollama models available"
    );
    Ok(())
}

/// Answers questions against a fixed index.
///
/// Every call runs embed → retrieve → generate from scratch; no state is kept
/// between calls, so a failed request has no effect on later ones.
#[derive(Clone)]
pub struct QueryEngine {
    index: Arc<VectorIndex>,
    retriever: Arc<Retriever>,
    generator: Arc<dyn AnswerGenerator>,
}

impl QueryEngine {
    /// The index this engine searches.
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Retrieve the top-K passages for `query` without generating an answer.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.retriever.retrieve(&self.index, query).await
    }

    /// Answer `query` from the retrieved passages.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyQuery`] for a blank query, or the embedding or
    /// generation error that stopped this request.
    pub async fn query(&self, query: &str) -> Result<Answer> {
        let started = Instant::now();
        let sources = self.retrieve(query).await?;

        let prompt = build_qa_prompt(query, &sources);
        let text = self.generator.generate(&prompt).await.inspect_err(|e| {
            error!(model = self.generator.model(), error = %e, "answer generation failed");
        })?;

        info!(
            source_count = sources.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query completed"
        );
        Ok(Answer { text: text.trim().to_string(), sources })
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config`, `fetcher`, `embedding_provider` and `generator` are required.
/// The chunker defaults to a [`RecursiveChunker`] and the store to an
/// [`FsIndexStore`], both configured from the [`RagConfig`].
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    fetcher: Option<Arc<dyn ContentFetcher>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    generator: Option<Arc<dyn AnswerGenerator>>,
    chunker: Option<Arc<dyn Chunker>>,
    store: Option<Arc<dyn IndexStore>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the content fetcher.
    pub fn fetcher(mut self, fetcher: Arc<dyn ContentFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the answer generator.
    pub fn generator(mut self, generator: Arc<dyn AnswerGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Override the index store.
    pub fn store(mut self, store: Arc<dyn IndexStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the [`RagPipeline`], validating the configuration and that all
    /// required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if any required field is missing or the
    /// configuration is invalid.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::Config("config is required".to_string()))?;
        config.validate()?;
        let fetcher =
            self.fetcher.ok_or_else(|| RagError::Config("fetcher is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let generator =
            self.generator.ok_or_else(|| RagError::Config("generator is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(RecursiveChunker::new(
                config.chunking.chunk_size,
                config.chunking.chunk_overlap,
            ))
        });
        let store =
            self.store.unwrap_or_else(|| Arc::new(FsIndexStore::new(config.index.dir.clone())));

        Ok(RagPipeline { config, fetcher, embedding_provider, generator, chunker, store })
    }
}
