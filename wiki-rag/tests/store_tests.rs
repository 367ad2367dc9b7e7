//! Filesystem index store tests.

use std::collections::HashMap;

use wiki_rag::document::Chunk;
use wiki_rag::{FsIndexStore, IndexStore, RagError, VectorIndex};

fn chunk(id: &str, title: &str, embedding: Vec<f32>) -> Chunk {
    Chunk {
        id: id.to_string(),
        text: format!("text of {id}"),
        embedding,
        metadata: HashMap::from([("page_title".to_string(), title.to_string())]),
        document_id: title.to_lowercase(),
        document_title: title.to_string(),
    }
}

fn sample_index() -> VectorIndex {
    VectorIndex::new(
        "nomic-embed-text",
        3,
        vec![
            chunk("honda_0", "Honda", vec![0.1, 0.2, 0.3]),
            chunk("honda_1", "Honda", vec![0.3, 0.2, 0.1]),
            chunk("mazda_0", "Mazda", vec![-0.5, 0.0, 0.5]),
        ],
    )
    .unwrap()
}

#[tokio::test]
async fn missing_directory_is_absent_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsIndexStore::new(dir.path().join("wiki_rag"));

    assert!(store.load().await.unwrap().is_none());
    assert!(store.manifest().await.unwrap().is_none());
}

#[tokio::test]
async fn save_then_load_returns_equal_index() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsIndexStore::new(dir.path().join("wiki_rag"));
    let index = sample_index();

    store.save(&index).await.unwrap();
    let loaded = store.load().await.unwrap().expect("index should be present");

    assert_eq!(loaded, index);
    assert_eq!(loaded.embedding_model(), "nomic-embed-text");

    let manifest = store.manifest().await.unwrap().unwrap();
    assert_eq!(manifest.chunk_count, 3);
    assert_eq!(manifest.document_count, 2);
    assert_eq!(manifest.dimensions, 3);
}

#[tokio::test]
async fn empty_index_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsIndexStore::new(dir.path());

    store.save(&VectorIndex::empty("nomic-embed-text")).await.unwrap();
    let loaded = store.load().await.unwrap().unwrap();

    assert!(loaded.is_empty());
    assert_eq!(loaded.embedding_model(), "nomic-embed-text");
}

#[tokio::test]
async fn save_replaces_previous_index() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsIndexStore::new(dir.path());

    store.save(&sample_index()).await.unwrap();
    let smaller =
        VectorIndex::new("nomic-embed-text", 2, vec![chunk("suzuki_0", "Suzuki", vec![1.0, 0.0])])
            .unwrap();
    store.save(&smaller).await.unwrap();

    assert_eq!(store.load().await.unwrap().unwrap(), smaller);
    assert!(!dir.path().join("chunks.json.tmp").exists());
    assert!(!dir.path().join("manifest.json.tmp").exists());
}

#[tokio::test]
async fn tampered_chunks_are_reported_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsIndexStore::new(dir.path());
    store.save(&sample_index()).await.unwrap();

    let chunks_path = dir.path().join("chunks.json");
    let mut bytes = std::fs::read(&chunks_path).unwrap();
    bytes.extend_from_slice(b" ");
    std::fs::write(&chunks_path, bytes).unwrap();

    let err = store.load().await.unwrap_err();
    assert!(matches!(err, RagError::IndexCorrupt { .. }), "unexpected error: {err}");
}

#[tokio::test]
async fn missing_chunks_file_is_reported_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsIndexStore::new(dir.path());
    store.save(&sample_index()).await.unwrap();

    std::fs::remove_file(dir.path().join("chunks.json")).unwrap();

    let err = store.load().await.unwrap_err();
    assert!(matches!(err, RagError::IndexCorrupt { .. }));
}

#[tokio::test]
async fn unreadable_manifest_is_reported_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("manifest.json"), "{ not json").unwrap();
    let store = FsIndexStore::new(dir.path());

    let err = store.load().await.unwrap_err();
    assert!(matches!(err, RagError::IndexCorrupt { .. }));
}

#[tokio::test]
async fn chunks_without_manifest_are_absent() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("chunks.json"), "[]").unwrap();
    let store = FsIndexStore::new(dir.path());

    assert!(store.load().await.unwrap().is_none());
}
