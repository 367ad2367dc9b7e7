//! Ollama embedding and generation providers.
//!
//! Both providers share one [`OllamaClient`], which talks to the daemon's
//! REST API (`/api/embed`, `/api/generate`, `/api/tags`) with `reqwest`.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wiki_rag::ollama::{OllamaClient, OllamaEmbeddingProvider, OllamaGenerator};
//!
//! let config = OllamaConfig::default();
//! let client = Arc::new(OllamaClient::new(&config)?);
//! client.ensure_model(&config.embedding_model).await?;
//!
//! let embedder = OllamaEmbeddingProvider::new(Arc::clone(&client), &config.embedding_model);
//! let generator = OllamaGenerator::new(client, &config.llm_model, config.temperature);
//! ```

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::OllamaConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generator::AnswerGenerator;

const PROVIDER: &str = "Ollama";

/// A thin HTTP client for a local Ollama daemon.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a client from its configuration section.
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client for Ollama: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout(),
        })
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The daemon's base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// List the names of the models pulled on the daemon.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.url("api/tags"))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RagError::ModelUnavailable {
                model: "*".into(),
                hint: format!(
                    "could not reach Ollama at {}: {e}. Is `ollama serve` running?",
                    self.base_url
                ),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(RagError::ModelUnavailable {
                model: "*".into(),
                hint: format!("Ollama at {} returned {status} when listing models", self.base_url),
            });
        }

        let tags: TagsResponse = response.json().await.map_err(|e| RagError::ModelUnavailable {
            model: "*".into(),
            hint: format!("unexpected model listing from Ollama: {e}"),
        })?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Check that `model` has been pulled.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ModelUnavailable`] if the daemon is unreachable or
    /// the model is missing.
    pub async fn ensure_model(&self, model: &str) -> Result<()> {
        let models = self.list_models().await.map_err(|e| match e {
            RagError::ModelUnavailable { hint, .. } => {
                RagError::ModelUnavailable { model: model.to_string(), hint }
            }
            other => other,
        })?;
        if models.iter().any(|name| model_matches(name, model)) {
            debug!(provider = PROVIDER, model, "model available");
            Ok(())
        } else {
            warn!(provider = PROVIDER, model, available = ?models, "model not pulled");
            Err(RagError::ModelUnavailable {
                model: model.to_string(),
                hint: format!("run `ollama pull {model}`"),
            })
        }
    }

    async fn embed_texts(&self, model: &str, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest { model, input: texts.to_vec() };
        let response = self
            .client
            .post(self.url("api/embed"))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, model, error = %e, "embedding request failed");
                embedding_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = error_detail(response).await;
            error!(provider = PROVIDER, model, %status, "embedding API error");
            return Err(embedding_error(format!("API returned {status}: {detail}")));
        }

        let body: EmbedResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, model, error = %e, "failed to parse embedding response");
            embedding_error(format!("failed to parse response: {e}"))
        })?;

        if body.embeddings.len() != texts.len() {
            return Err(embedding_error(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.embeddings.len()
            )));
        }
        Ok(body.embeddings)
    }

    async fn generate_text(&self, model: &str, prompt: &str, temperature: f32) -> Result<String> {
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature },
        };
        let timeout = self.timeout;
        let response = self
            .client
            .post(self.url("api/generate"))
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, model, error = %e, "generation request failed");
                generation_error("request failed", e, timeout)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = error_detail(response).await;
            error!(provider = PROVIDER, model, %status, "generation API error");
            return Err(RagError::Generation {
                provider: PROVIDER.into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, model, error = %e, "failed to read generation response");
            generation_error("failed to read response", e, timeout)
        })?;
        Ok(body.response)
    }
}

/// Ollama reports pulled models with an explicit tag (`llama3.2:latest`).
fn model_matches(pulled: &str, wanted: &str) -> bool {
    pulled == wanted || (!wanted.contains(':') && pulled == format!("{wanted}:latest"))
}

fn embedding_error(message: String) -> RagError {
    RagError::Embedding { provider: PROVIDER.into(), message }
}

fn generation_error(context: &str, e: reqwest::Error, timeout: Duration) -> RagError {
    if e.is_timeout() {
        RagError::GenerationTimeout { timeout }
    } else {
        RagError::Generation { provider: PROVIDER.into(), message: format!("{context}: {e}") }
    }
}

async fn error_detail(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body)
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

/// An [`EmbeddingProvider`] backed by Ollama's `/api/embed` endpoint.
///
/// The dimensionality is learned from the first successful response.
pub struct OllamaEmbeddingProvider {
    client: Arc<OllamaClient>,
    model: String,
    dimensions: OnceLock<usize>,
}

impl OllamaEmbeddingProvider {
    /// Create a provider for `model` on a shared client.
    pub fn new(client: Arc<OllamaClient>, model: impl Into<String>) -> Self {
        Self { client, model: model.into(), dimensions: OnceLock::new() }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");
        let results = self.embed_batch(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| embedding_error("API returned empty response".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let embeddings = self.client.embed_texts(&self.model, texts).await?;
        if let Some(first) = embeddings.first() {
            if first.is_empty() {
                return Err(embedding_error("API returned an empty embedding".into()));
            }
            let _ = self.dimensions.set(first.len());
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions.get().copied()
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// ── AnswerGenerator implementation ─────────────────────────────────

/// An [`AnswerGenerator`] backed by Ollama's `/api/generate` endpoint.
///
/// Requests are non-streaming and bounded by the client's timeout.
pub struct OllamaGenerator {
    client: Arc<OllamaClient>,
    model: String,
    temperature: f32,
}

impl OllamaGenerator {
    /// Create a generator for `model` on a shared client.
    pub fn new(client: Arc<OllamaClient>, model: impl Into<String>, temperature: f32) -> Self {
        Self { client, model: model.into(), temperature }
    }
}

#[async_trait]
impl AnswerGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "generating");
        self.client.generate_text(&self.model, prompt, self.temperature).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}
