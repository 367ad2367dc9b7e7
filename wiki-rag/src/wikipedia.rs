//! Wikipedia content fetcher using the MediaWiki Action API.
//!
//! Titles are looked up exactly as configured (following redirects, but
//! without search-based suggestions), and each page comes back as plain text.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::WikipediaConfig;
use crate::document::Document;
use crate::error::{RagError, Result};
use crate::fetcher::ContentFetcher;

const SOURCE: &str = "Wikipedia";

/// A [`ContentFetcher`] backed by the Wikipedia `prop=extracts` API.
///
/// # Example
///
/// ```rust,ignore
/// use wiki_rag::{ContentFetcher, WikipediaConfig, WikipediaFetcher};
///
/// let fetcher = WikipediaFetcher::new(&WikipediaConfig::default())?;
/// let doc = fetcher.fetch("Mazda").await?;
/// println!("{}: {} chars", doc.title, doc.text.len());
/// ```
pub struct WikipediaFetcher {
    client: reqwest::Client,
    api_url: String,
    language: String,
}

impl WikipediaFetcher {
    /// Create a fetcher from its configuration section.
    pub fn new(config: &WikipediaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| RagError::Fetch {
                source_name: SOURCE.into(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, api_url: config.api_url.clone(), language: config.language.clone() })
    }

    fn page_url(&self, title: &str) -> String {
        format!("https://{}.wikipedia.org/wiki/{}", self.language, title.replace(' ', "_"))
    }
}

// ── MediaWiki API response types (formatversion=2) ─────────────────

#[derive(Deserialize)]
struct QueryResponse {
    query: Option<QueryBody>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Deserialize)]
struct Page {
    pageid: Option<u64>,
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    extract: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    code: String,
    info: String,
}

// ── ContentFetcher implementation ──────────────────────────────────

#[async_trait]
impl ContentFetcher for WikipediaFetcher {
    async fn fetch(&self, title: &str) -> Result<Document> {
        debug!(source = SOURCE, title, "fetching page");

        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("formatversion", "2"),
                ("prop", "extracts"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title),
            ])
            .send()
            .await
            .map_err(|e| {
                error!(source = SOURCE, title, error = %e, "request failed");
                RagError::Fetch {
                    source_name: SOURCE.into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            error!(source = SOURCE, title, %status, "API error");
            return Err(RagError::Fetch {
                source_name: SOURCE.into(),
                message: format!("API returned {status} for '{title}'"),
            });
        }

        let body: QueryResponse = response.json().await.map_err(|e| {
            error!(source = SOURCE, title, error = %e, "failed to parse response");
            RagError::Fetch {
                source_name: SOURCE.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        if let Some(api_error) = body.error {
            return Err(RagError::Fetch {
                source_name: SOURCE.into(),
                message: format!("{}: {}", api_error.code, api_error.info),
            });
        }

        let page = body
            .query
            .and_then(|q| q.pages.into_iter().next())
            .ok_or_else(|| RagError::DocumentNotFound { title: title.to_string() })?;

        if page.missing || page.invalid {
            return Err(RagError::DocumentNotFound { title: title.to_string() });
        }

        let id = page.pageid.map(|id| id.to_string()).unwrap_or_else(|| page.title.clone());
        let url = self.page_url(&page.title);
        let mut document = Document::new(id.clone(), page.title, page.extract.unwrap_or_default())
            .with_source_uri(url);
        document.metadata.insert("page_id".to_string(), id);

        debug!(
            source = SOURCE,
            title = %document.title,
            text_len = document.text.len(),
            "fetched page"
        );
        Ok(document)
    }

    fn name(&self) -> &str {
        SOURCE
    }
}
