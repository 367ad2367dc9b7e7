//! Index persistence.
//!
//! [`IndexStore`] is the narrow load/save seam between the pipeline and the
//! on-disk format. [`FsIndexStore`] keeps an index in a directory:
//!
//! - `chunks.json` holds every chunk with its embedding;
//! - `manifest.json` records the embedding model, dimensions, chunk count,
//!   creation time and the SHA-256 of `chunks.json`.
//!
//! Files are written under a temporary name and renamed into place, manifest
//! last. A directory without a manifest therefore holds no index; a manifest
//! whose chunk file does not match it is a corrupt index.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info};

use crate::document::Chunk;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;

/// Load/save interface for a persisted [`VectorIndex`].
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Load the persisted index.
    ///
    /// Returns `Ok(None)` when nothing has been persisted yet.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexCorrupt`] when an index is present but cannot
    /// be read back intact.
    async fn load(&self) -> Result<Option<VectorIndex>>;

    /// Persist `index`, replacing whatever was stored before.
    async fn save(&self, index: &VectorIndex) -> Result<()>;
}

const MANIFEST_FILE: &str = "manifest.json";
const CHUNKS_FILE: &str = "chunks.json";
const FORMAT_VERSION: u32 = 1;

/// Metadata written next to the chunks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexManifest {
    /// On-disk format version.
    pub format_version: u32,
    /// Embedding model the chunks were embedded with.
    pub embedding_model: String,
    /// Embedding dimensionality.
    pub dimensions: usize,
    /// Number of chunks in `chunks.json`.
    pub chunk_count: usize,
    /// Number of distinct source documents.
    pub document_count: usize,
    /// When the index was saved.
    pub created_at: DateTime<Utc>,
    /// Hex SHA-256 of `chunks.json`.
    pub checksum: String,
}

/// An [`IndexStore`] that keeps the index as JSON files in a directory.
#[derive(Debug, Clone)]
pub struct FsIndexStore {
    dir: PathBuf,
}

impl FsIndexStore {
    /// Create a store rooted at `dir`. Nothing is touched until `load`/`save`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The index directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read just the manifest, if one exists.
    pub async fn manifest(&self) -> Result<Option<IndexManifest>> {
        let path = self.dir.join(MANIFEST_FILE);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.corrupt(format!("failed to read manifest: {e}"))),
        };
        let manifest: IndexManifest = serde_json::from_slice(&bytes)
            .map_err(|e| self.corrupt(format!("invalid manifest: {e}")))?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(self.corrupt(format!(
                "unsupported format version {} (expected {FORMAT_VERSION})",
                manifest.format_version
            )));
        }
        Ok(Some(manifest))
    }

    fn corrupt(&self, message: String) -> RagError {
        error!(path = %self.dir.display(), %message, "persisted index is corrupt");
        RagError::IndexCorrupt { path: self.dir.display().to_string(), message }
    }

    fn store_error(&self, message: String) -> RagError {
        error!(path = %self.dir.display(), %message, "failed to persist index");
        RagError::IndexStore { path: self.dir.display().to_string(), message }
    }

    async fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let target = self.dir.join(name);
        let tmp = self.dir.join(format!("{name}.tmp"));
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| self.store_error(format!("failed to write {name}: {e}")))?;
        tokio::fs::rename(&tmp, &target)
            .await
            .map_err(|e| self.store_error(format!("failed to move {name} into place: {e}")))
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl IndexStore for FsIndexStore {
    async fn load(&self) -> Result<Option<VectorIndex>> {
        let Some(manifest) = self.manifest().await? else {
            debug!(path = %self.dir.display(), "no persisted index");
            return Ok(None);
        };

        let bytes = tokio::fs::read(self.dir.join(CHUNKS_FILE))
            .await
            .map_err(|e| self.corrupt(format!("failed to read {CHUNKS_FILE}: {e}")))?;
        let checksum = sha256_hex(&bytes);
        if checksum != manifest.checksum {
            return Err(self.corrupt(format!(
                "checksum mismatch for {CHUNKS_FILE}: manifest has {}, file has {checksum}",
                manifest.checksum
            )));
        }

        let chunks: Vec<Chunk> = serde_json::from_slice(&bytes)
            .map_err(|e| self.corrupt(format!("invalid {CHUNKS_FILE}: {e}")))?;
        if chunks.len() != manifest.chunk_count {
            return Err(self.corrupt(format!(
                "manifest lists {} chunks, found {}",
                manifest.chunk_count,
                chunks.len()
            )));
        }

        let index = if chunks.is_empty() {
            VectorIndex::empty(manifest.embedding_model)
        } else {
            VectorIndex::new(manifest.embedding_model, manifest.dimensions, chunks)
                .map_err(|e| self.corrupt(e.to_string()))?
        };

        info!(
            path = %self.dir.display(),
            chunk_count = index.len(),
            embedding_model = index.embedding_model(),
            created_at = %manifest.created_at,
            "loaded persisted index"
        );
        Ok(Some(index))
    }

    async fn save(&self, index: &VectorIndex) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| self.store_error(format!("failed to create directory: {e}")))?;

        let chunks = serde_json::to_vec(index.chunks())
            .map_err(|e| self.store_error(format!("failed to serialize chunks: {e}")))?;
        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            embedding_model: index.embedding_model().to_string(),
            dimensions: index.dimensions(),
            chunk_count: index.len(),
            document_count: index.document_count(),
            created_at: Utc::now(),
            checksum: sha256_hex(&chunks),
        };
        let manifest = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| self.store_error(format!("failed to serialize manifest: {e}")))?;

        // a crash between these two writes leaves the previous manifest, which
        // no longer matches the new chunks and is reported as corrupt on load
        self.write_atomic(CHUNKS_FILE, &chunks).await?;
        self.write_atomic(MANIFEST_FILE, &manifest).await?;

        info!(path = %self.dir.display(), chunk_count = index.len(), "saved index");
        Ok(())
    }
}
