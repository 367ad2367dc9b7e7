//! # wiki-rag
//!
//! Retrieval-augmented question answering over a fixed set of Wikipedia
//! pages, with embeddings and answers served by a local Ollama daemon.
//!
//! ## Overview
//!
//! - [`WikipediaFetcher`] resolves page titles into [`Document`]s
//! - a [`Chunker`] splits them and the [`Indexer`] embeds every [`Chunk`]
//! - [`FsIndexStore`] persists the resulting [`VectorIndex`] so later runs
//!   skip fetching and embedding
//! - [`QueryEngine`] embeds a question, retrieves the top-K chunks and asks
//!   the [`AnswerGenerator`] for an [`Answer`] that cites them
//!
//! [`RagPipeline`] wires these together and decides once, at start-up,
//! whether to load or build the index.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wiki_rag::ollama::{OllamaClient, OllamaEmbeddingProvider, OllamaGenerator};
//! use wiki_rag::{RagConfig, RagPipeline, WikipediaFetcher};
//!
//! let config = RagConfig::default();
//! let client = Arc::new(OllamaClient::new(&config.ollama)?);
//! let pipeline = RagPipeline::builder()
//!     .fetcher(Arc::new(WikipediaFetcher::new(&config.wikipedia)?))
//!     .embedding_provider(Arc::new(OllamaEmbeddingProvider::new(
//!         Arc::clone(&client),
//!         &config.ollama.embedding_model,
//!     )))
//!     .generator(Arc::new(OllamaGenerator::new(
//!         client,
//!         &config.ollama.llm_model,
//!         config.ollama.temperature,
//!     )))
//!     .config(config)
//!     .build()?;
//!
//! let engine = pipeline.query_engine().await?;
//! let answer = engine.query("Who founded Honda?").await?;
//! for source in &answer.sources {
//!     println!("{} ({:.2})", source.title(), source.score);
//! }
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod fetcher;
pub mod generator;
pub mod index;
pub mod indexer;
pub mod ollama;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod store;
pub mod wikipedia;

pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
pub use config::{
    ChunkingConfig, IndexConfig, OllamaConfig, RagConfig, RagConfigBuilder, RetrievalConfig,
    WikipediaConfig,
};
pub use document::{Answer, Chunk, Document, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use fetcher::ContentFetcher;
pub use generator::AnswerGenerator;
pub use index::VectorIndex;
pub use indexer::Indexer;
pub use pipeline::{
    IndexOrigin, QueryEngine, RagPipeline, RagPipelineBuilder, check_services,
};
pub use retriever::Retriever;
pub use store::{FsIndexStore, IndexManifest, IndexStore};
pub use wikipedia::WikipediaFetcher;
