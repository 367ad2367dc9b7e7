//! Error types for the `wiki-rag` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while building, loading or querying the knowledge base.
#[derive(Debug, Error)]
pub enum RagError {
    /// The content source could not be reached or returned an unusable response.
    #[error("Fetch error ({source_name}): {message}")]
    Fetch {
        /// The content source that produced the error.
        source_name: String,
        /// A description of the failure.
        message: String,
    },

    /// A configured document title does not resolve to a page.
    #[error("Document not found: '{title}'")]
    DocumentNotFound {
        /// The title that could not be resolved.
        title: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The text-generation service failed.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The text-generation service did not answer within the configured timeout.
    #[error("Generation timed out after {}s", .timeout.as_secs_f64())]
    GenerationTimeout {
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// A configured model is not available on the model-serving daemon.
    #[error("Model '{model}' is not available: {hint}")]
    ModelUnavailable {
        /// The missing model.
        model: String,
        /// What the operator can do about it.
        hint: String,
    },

    /// The persisted index was built with a different embedding model.
    #[error(
        "Embedding model mismatch: index was built with '{stored}' but '{configured}' is configured"
    )]
    ModelMismatch {
        /// The model recorded in the persisted index.
        stored: String,
        /// The model the current configuration uses.
        configured: String,
    },

    /// A persisted index exists but cannot be read back.
    #[error("Index at '{path}' is corrupt: {message}")]
    IndexCorrupt {
        /// The index directory.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// The index could not be written or its directory inspected.
    #[error("Index store error at '{path}': {message}")]
    IndexStore {
        /// The index directory.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during document chunking.
    #[error("Chunking error: {0}")]
    Chunking(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The query was empty or whitespace only.
    #[error("Query must not be empty")]
    EmptyQuery,

    /// An error in the pipeline orchestration.
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

impl RagError {
    /// Whether the error was raised by the text-generation step of a single request.
    pub fn is_generation_error(&self) -> bool {
        matches!(self, RagError::Generation { .. } | RagError::GenerationTimeout { .. })
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
