//! End-to-end pipeline tests with in-process stand-ins for Wikipedia,
//! the embedding model, the language model and the index store.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use wiki_rag::{
    AnswerGenerator, ContentFetcher, Document, EmbeddingProvider, IndexOrigin, IndexStore,
    RagConfig, RagError, RagPipeline, Result, VectorIndex,
};

const VOCABULARY: [&str; 8] = ["sky", "blue", "grass", "green", "color", "the", "is", "what"];
const MODEL: &str = "vocab-embed";

/// Serves page text from a map and records every lookup.
#[derive(Default)]
struct StubFetcher {
    pages: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    fn with_pages(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages.iter().map(|(t, text)| (t.to_string(), text.to_string())).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentFetcher for StubFetcher {
    async fn fetch(&self, title: &str) -> Result<Document> {
        self.calls.lock().unwrap().push(title.to_string());
        let text = self
            .pages
            .get(title)
            .ok_or_else(|| RagError::DocumentNotFound { title: title.to_string() })?;
        Ok(Document::new(title.to_lowercase(), title, text.clone()))
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Bag-of-words embedding over a tiny fixed vocabulary.
#[derive(Default)]
struct VocabEmbedder {
    embedded_texts: AtomicUsize,
}

impl VocabEmbedder {
    fn calls(&self) -> usize {
        self.embedded_texts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for VocabEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embedded_texts.fetch_add(1, Ordering::SeqCst);
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered.split(|c: char| !c.is_alphanumeric()).collect();
        Ok(VOCABULARY
            .iter()
            .map(|term| words.iter().filter(|w| *w == term).count() as f32)
            .collect())
    }

    fn dimensions(&self) -> Option<usize> {
        Some(VOCABULARY.len())
    }

    fn model_id(&self) -> &str {
        MODEL
    }
}

/// Replays scripted replies and records every prompt.
#[derive(Default)]
struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn replying(replies: Vec<Result<String>>) -> Self {
        Self { replies: Mutex::new(replies.into()), prompts: Mutex::new(Vec::new()) }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies.lock().unwrap().pop_front().unwrap_or_else(|| Ok("no answer".to_string()))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Keeps the saved index in memory.
#[derive(Default)]
struct MemoryStore {
    index: Mutex<Option<VectorIndex>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    fn holding(index: VectorIndex) -> Self {
        Self { index: Mutex::new(Some(index)), saves: AtomicUsize::new(0) }
    }

    fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndexStore for MemoryStore {
    async fn load(&self) -> Result<Option<VectorIndex>> {
        Ok(self.index.lock().unwrap().clone())
    }

    async fn save(&self, index: &VectorIndex) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.index.lock().unwrap() = Some(index.clone());
        Ok(())
    }
}

struct Harness {
    fetcher: Arc<StubFetcher>,
    embedder: Arc<VocabEmbedder>,
    generator: Arc<ScriptedGenerator>,
    store: Arc<MemoryStore>,
    pipeline: RagPipeline,
}

fn alpha_beta() -> StubFetcher {
    StubFetcher::with_pages(&[("Alpha", "The sky is blue."), ("Beta", "The grass is green.")])
}

fn harness(fetcher: StubFetcher, generator: ScriptedGenerator, store: MemoryStore) -> Harness {
    let fetcher = Arc::new(fetcher);
    let embedder = Arc::new(VocabEmbedder::default());
    let generator = Arc::new(generator);
    let store = Arc::new(store);
    let config = RagConfig::builder().pages(["Alpha", "Beta"]).top_k(3).build().unwrap();
    let pipeline = RagPipeline::builder()
        .config(config)
        .fetcher(fetcher.clone())
        .embedding_provider(embedder.clone())
        .generator(generator.clone())
        .store(store.clone())
        .build()
        .unwrap();
    Harness { fetcher, embedder, generator, store, pipeline }
}

#[tokio::test]
async fn first_run_fetches_embeds_and_saves_once() {
    let h = harness(alpha_beta(), ScriptedGenerator::default(), MemoryStore::default());

    let (index, origin) = h.pipeline.load_or_build().await.unwrap();

    assert_eq!(origin, IndexOrigin::Built);
    assert_eq!(h.fetcher.calls(), vec!["Alpha".to_string(), "Beta".to_string()]);
    assert_eq!(h.embedder.calls(), index.len());
    assert_eq!(index.len(), 2);
    assert_eq!(index.embedding_model(), MODEL);
    assert_eq!(h.store.saves(), 1);
}

#[tokio::test]
async fn second_run_loads_without_fetching_or_embedding() {
    let h = harness(alpha_beta(), ScriptedGenerator::default(), MemoryStore::default());
    let (built, _) = h.pipeline.load_or_build().await.unwrap();
    let fetches = h.fetcher.calls().len();
    let embeds = h.embedder.calls();

    let (loaded, origin) = h.pipeline.load_or_build().await.unwrap();

    assert_eq!(origin, IndexOrigin::Loaded);
    assert_eq!(loaded, built);
    assert_eq!(h.fetcher.calls().len(), fetches);
    assert_eq!(h.embedder.calls(), embeds);
    assert_eq!(h.store.saves(), 1);
}

#[tokio::test]
async fn answer_cites_the_most_similar_page_first() {
    let generator =
        ScriptedGenerator::replying(vec![Ok("  The sky is blue according to Alpha. ".into())]);
    let h = harness(alpha_beta(), generator, MemoryStore::default());
    let engine = h.pipeline.query_engine().await.unwrap();

    let answer = engine.query("What color is the sky?").await.unwrap();

    assert_eq!(answer.text, "The sky is blue according to Alpha.");
    let titles: Vec<&str> = answer.sources.iter().map(|s| s.title()).collect();
    assert_eq!(titles, vec!["Alpha", "Beta"]);
    assert!(answer.sources[0].score > answer.sources[1].score);

    let prompts = h.generator.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("The sky is blue."));
    assert!(prompts[0].contains("Query: What color is the sky?"));
    let alpha_at = prompts[0].find("[Source: Alpha]").unwrap();
    let beta_at = prompts[0].find("[Source: Beta]").unwrap();
    assert!(alpha_at < beta_at);
}

#[tokio::test]
async fn generation_timeout_does_not_poison_later_queries() {
    let generator = ScriptedGenerator::replying(vec![
        Err(RagError::GenerationTimeout { timeout: Duration::from_secs(300) }),
        Ok("Green.".into()),
    ]);
    let h = harness(alpha_beta(), generator, MemoryStore::default());
    let engine = h.pipeline.query_engine().await.unwrap();

    let err = engine.query("What color is the grass?").await.unwrap_err();
    assert!(matches!(err, RagError::GenerationTimeout { .. }));
    assert!(err.is_generation_error());

    let answer = engine.query("What color is the grass?").await.unwrap();
    assert_eq!(answer.text, "Green.");
    assert_eq!(answer.sources[0].title(), "Beta");
}

#[tokio::test]
async fn blank_query_is_rejected_before_embedding() {
    let h = harness(alpha_beta(), ScriptedGenerator::default(), MemoryStore::default());
    let engine = h.pipeline.query_engine().await.unwrap();
    let embeds = h.embedder.calls();

    let err = engine.query("   ").await.unwrap_err();

    assert!(matches!(err, RagError::EmptyQuery));
    assert_eq!(h.embedder.calls(), embeds);
    assert!(h.generator.prompts().is_empty());
}

#[tokio::test]
async fn persisted_index_from_another_model_is_refused() {
    let stale = VectorIndex::empty("some-other-model");
    let h = harness(alpha_beta(), ScriptedGenerator::default(), MemoryStore::holding(stale));

    let err = h.pipeline.load_or_build().await.unwrap_err();

    assert!(matches!(
        err,
        RagError::ModelMismatch { ref stored, ref configured }
            if stored == "some-other-model" && configured == MODEL
    ));
    assert!(h.fetcher.calls().is_empty());
}

#[tokio::test]
async fn missing_page_aborts_the_build_and_saves_nothing() {
    let fetcher = StubFetcher::with_pages(&[("Alpha", "The sky is blue.")]);
    let h = harness(fetcher, ScriptedGenerator::default(), MemoryStore::default());

    let err = h.pipeline.load_or_build().await.unwrap_err();

    assert!(matches!(err, RagError::DocumentNotFound { ref title } if title == "Beta"));
    assert_eq!(h.store.saves(), 0);
    assert_eq!(h.embedder.calls(), 0);
}

#[tokio::test]
async fn rebuild_refetches_even_when_an_index_exists() {
    let h = harness(alpha_beta(), ScriptedGenerator::default(), MemoryStore::default());
    h.pipeline.load_or_build().await.unwrap();

    h.pipeline.rebuild().await.unwrap();

    assert_eq!(h.fetcher.calls().len(), 4);
    assert_eq!(h.store.saves(), 2);
}

#[tokio::test]
async fn empty_pages_still_produce_a_queryable_index() {
    let fetcher = StubFetcher::with_pages(&[("Alpha", ""), ("Beta", "   ")]);
    let generator = ScriptedGenerator::replying(vec![Ok("I don't know.".into())]);
    let h = harness(fetcher, generator, MemoryStore::default());
    let engine = h.pipeline.query_engine().await.unwrap();

    let answer = engine.query("What color is the sky?").await.unwrap();

    assert!(engine.index().is_empty());
    assert!(answer.sources.is_empty());
    assert_eq!(answer.text, "I don't know.");
    assert_eq!(h.embedder.calls(), 0);
}

#[test]
fn builder_requires_a_fetcher() {
    let result = RagPipeline::builder()
        .config(RagConfig::default())
        .embedding_provider(Arc::new(VocabEmbedder::default()))
        .generator(Arc::new(ScriptedGenerator::default()))
        .build();

    assert!(matches!(result, Err(RagError::Config(msg)) if msg.contains("fetcher")));
}
