//! Configuration for the knowledge base, the model daemon and retrieval.
//!
//! Every component receives the section it needs at construction time.
//! Nothing is read from process-wide state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Pages indexed when no explicit list is configured.
pub const DEFAULT_PAGES: &[&str] = &["Honda", "Toyota", "Mazda", "Mitsubishi", "Nissan", "Suzuki"];

/// Top-level configuration for the RAG assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RagConfig {
    /// Where the knowledge-base text comes from.
    pub wikipedia: WikipediaConfig,
    /// The local model-serving daemon.
    pub ollama: OllamaConfig,
    /// How documents are split and embedded.
    pub chunking: ChunkingConfig,
    /// How many chunks a query retrieves.
    pub retrieval: RetrievalConfig,
    /// Where the index is persisted.
    pub index: IndexConfig,
}

/// Content source settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WikipediaConfig {
    /// MediaWiki Action API endpoint.
    pub api_url: String,
    /// Language subdomain used to build page URLs.
    pub language: String,
    /// Exact page titles that make up the knowledge base.
    pub pages: Vec<String>,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            api_url: "https://en.wikipedia.org/w/api.php".to_string(),
            language: "en".to_string(),
            pages: DEFAULT_PAGES.iter().map(|p| p.to_string()).collect(),
            user_agent: concat!("wiki-rag/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Ollama daemon settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    /// Base URL of the daemon.
    pub base_url: String,
    /// Model used to write answers.
    pub llm_model: String,
    /// Model used to embed chunks and queries.
    pub embedding_model: String,
    /// Sampling temperature for answer generation.
    pub temperature: f32,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            llm_model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            temperature: 0.0,
            request_timeout_secs: 300,
        }
    }
}

impl OllamaConfig {
    /// The per-request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Chunking and embedding batch settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks sent to the embedding service per request.
    pub embed_batch_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1024, chunk_overlap: 200, embed_batch_size: 10 }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of top results to return from vector search.
    pub top_k: usize,
    /// Minimum similarity score for results (results below this are filtered out).
    pub similarity_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3, similarity_threshold: f32::MIN }
    }
}

/// Index persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory holding the persisted index.
    pub dir: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("wiki_rag") }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Parse a TOML document. Missing sections and keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| RagError::Config(format!("invalid TOML configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RagError::Config(format!("failed to read config file '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0` or `embed_batch_size == 0`
    /// - the page list or a model name is empty
    /// - the request timeout is zero
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.chunking.embed_batch_size == 0 {
            return Err(RagError::Config("embed_batch_size must be greater than zero".into()));
        }
        if self.retrieval.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if self.wikipedia.pages.is_empty() {
            return Err(RagError::Config("at least one page must be configured".to_string()));
        }
        if let Some(blank) = self.wikipedia.pages.iter().find(|p| p.trim().is_empty()) {
            return Err(RagError::Config(format!("page titles must not be blank: {blank:?}")));
        }
        if self.ollama.llm_model.trim().is_empty() {
            return Err(RagError::Config("llm_model must not be empty".to_string()));
        }
        if self.ollama.embedding_model.trim().is_empty() {
            return Err(RagError::Config("embedding_model must not be empty".to_string()));
        }
        if self.ollama.request_timeout_secs == 0 {
            return Err(RagError::Config("request_timeout_secs must be greater than zero".into()));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Start from an existing configuration, e.g. one loaded from a file.
    pub fn from_config(config: RagConfig) -> Self {
        Self { config }
    }

    /// Set the page titles that make up the knowledge base.
    pub fn pages<I, S>(mut self, pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.wikipedia.pages = pages.into_iter().map(Into::into).collect();
        self
    }

    /// Set the Wikipedia API endpoint.
    pub fn wikipedia_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.wikipedia.api_url = url.into();
        self
    }

    /// Set the Ollama base URL.
    pub fn ollama_url(mut self, url: impl Into<String>) -> Self {
        self.config.ollama.base_url = url.into();
        self
    }

    /// Set the answer-generation model.
    pub fn llm_model(mut self, model: impl Into<String>) -> Self {
        self.config.ollama.llm_model = model.into();
        self
    }

    /// Set the embedding model.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.ollama.embedding_model = model.into();
        self
    }

    /// Set the generation temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.ollama.temperature = temperature;
        self
    }

    /// Set the per-request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.ollama.request_timeout_secs = timeout.as_secs();
        self
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunking.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunking.chunk_overlap = overlap;
        self
    }

    /// Set how many chunks are embedded per request.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.chunking.embed_batch_size = size;
        self
    }

    /// Set the number of top results to return from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.retrieval.top_k = k;
        self
    }

    /// Set the minimum similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.retrieval.similarity_threshold = threshold;
        self
    }

    /// Set the index directory.
    pub fn index_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.index.dir = dir.into();
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_car_maker_knowledge_base() {
        let config = RagConfig::default();
        assert_eq!(config.wikipedia.pages.len(), 6);
        assert_eq!(config.ollama.llm_model, "llama3.2");
        assert_eq!(config.ollama.embedding_model, "nomic-embed-text");
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.ollama.request_timeout(), Duration::from_secs(300));
        assert_eq!(config.index.dir, PathBuf::from("wiki_rag"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, RagError::Config(msg) if msg.contains("chunk_overlap")));
    }

    #[test]
    fn rejects_zero_top_k_and_empty_pages() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().pages(Vec::<String>::new()).build().is_err());
        assert!(RagConfig::builder().pages(["Honda", "  "]).build().is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        assert!(RagConfig::builder().request_timeout(Duration::from_millis(10)).build().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = RagConfig::from_toml_str(
            r#"
            [wikipedia]
            pages = ["Ferrari", "Porsche"]

            [retrieval]
            top_k = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.wikipedia.pages, vec!["Ferrari", "Porsche"]);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.chunking, ChunkingConfig::default());
        assert_eq!(config.ollama, OllamaConfig::default());
    }

    #[test]
    fn invalid_toml_values_are_rejected() {
        let err = RagConfig::from_toml_str("[chunking]\nchunk_size = 10\nchunk_overlap = 20\n")
            .unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
        assert!(RagConfig::from_toml_str("retrieval = 3").is_err());
    }

    #[test]
    fn example_file_spells_out_the_defaults() {
        let config =
            RagConfig::from_toml_str(include_str!("../../wiki-rag.example.toml")).unwrap();
        assert_eq!(config, RagConfig::default());
    }
}
