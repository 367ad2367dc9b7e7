//! # wiki-rag
//!
//! Answers questions about a fixed set of Wikipedia pages with a local
//! Ollama model, citing the passages each answer was grounded on.
//!
//! Usage:
//!   wiki-rag ask "What is the history of Mazda?"
//!   wiki-rag chat                           # one question per line
//!   wiki-rag index --rebuild                # refetch and re-embed every page
//!   wiki-rag --config wiki-rag.toml chat    # settings from a TOML file

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wiki_rag::ollama::{OllamaClient, OllamaEmbeddingProvider, OllamaGenerator};
use wiki_rag::{
    Answer, IndexOrigin, QueryEngine, RagConfig, RagConfigBuilder, RagPipeline, VectorIndex,
    WikipediaFetcher, check_services,
};

#[derive(Parser, Debug)]
#[command(
    name = "wiki-rag",
    version,
    about = "Ask questions about Wikipedia pages, answered by a local Ollama model"
)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, env = "WIKI_RAG_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the persisted index
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,

    /// Ollama base URL
    #[arg(long, global = true, env = "WIKI_RAG_OLLAMA_URL")]
    ollama_url: Option<String>,

    /// Model used to write answers
    #[arg(long, global = true)]
    llm_model: Option<String>,

    /// Model used to embed pages and questions
    #[arg(long, global = true)]
    embedding_model: Option<String>,

    /// Number of passages retrieved per question
    #[arg(long, global = true)]
    top_k: Option<usize>,

    /// Wikipedia page to index (repeatable, replaces the configured list)
    #[arg(long = "page", global = true)]
    pages: Vec<String>,

    /// Print the retrieved passages under each answer (default)
    #[arg(long, global = true, overrides_with = "no_sources")]
    show_sources: bool,

    /// Print only the answer
    #[arg(long, global = true, overrides_with = "show_sources")]
    no_sources: bool,

    /// Do not check that Ollama is running and the models are pulled
    #[arg(long, global = true)]
    skip_service_check: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer a single question
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Answer questions interactively
    Chat,
    /// Build the index if needed and print its statistics
    Index {
        /// Refetch and re-embed every page even if an index exists
        #[arg(long)]
        rebuild: bool,
    },
}

impl Cli {
    fn show_sources(&self) -> bool {
        !self.no_sources
    }

    /// Layer command-line overrides over the configuration file (or defaults).
    fn resolve_config(&self) -> Result<RagConfig> {
        let base = match &self.config {
            Some(path) => RagConfig::load_from(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?,
            None => RagConfig::default(),
        };

        let mut builder = RagConfigBuilder::from_config(base);
        if let Some(dir) = &self.index_dir {
            builder = builder.index_dir(dir.clone());
        }
        if let Some(url) = &self.ollama_url {
            builder = builder.ollama_url(url.clone());
        }
        if let Some(model) = &self.llm_model {
            builder = builder.llm_model(model.clone());
        }
        if let Some(model) = &self.embedding_model {
            builder = builder.embedding_model(model.clone());
        }
        if let Some(k) = self.top_k {
            builder = builder.top_k(k);
        }
        if !self.pages.is_empty() {
            builder = builder.pages(self.pages.clone());
        }
        builder.build().context("invalid configuration")
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_pipeline(config: RagConfig, client: Arc<OllamaClient>) -> Result<RagPipeline> {
    let fetcher = WikipediaFetcher::new(&config.wikipedia)?;
    let embedder =
        OllamaEmbeddingProvider::new(Arc::clone(&client), config.ollama.embedding_model.clone());
    let generator = OllamaGenerator::new(
        client,
        config.ollama.llm_model.clone(),
        config.ollama.temperature,
    );

    let pipeline = RagPipeline::builder()
        .config(config)
        .fetcher(Arc::new(fetcher))
        .embedding_provider(Arc::new(embedder))
        .generator(Arc::new(generator))
        .build()?;
    Ok(pipeline)
}

fn print_answer(answer: &Answer, show_sources: bool) {
    println!("{}", answer.text);
    if !show_sources {
        return;
    }
    for source in &answer.sources {
        println!();
        println!("Source: {} (Score: {:.2})", source.title(), source.score);
        println!("{}", source.chunk.text.trim());
    }
}

fn print_index_stats(index: &VectorIndex, origin: IndexOrigin, config: &RagConfig) {
    println!(
        "Index {origin}: {} chunks from {} pages in {}",
        index.len(),
        index.document_count(),
        config.index.dir.display()
    );
    println!("Embedding model: {} ({} dimensions)", index.embedding_model(), index.dimensions());
}

async fn chat(engine: &QueryEngine, show_sources: bool) -> Result<()> {
    let mut editor = DefaultEditor::new().context("failed to start line editor")?;
    println!("Ask a question about the indexed pages. Type 'exit' or press Ctrl-D to quit.");

    loop {
        let line = match editor.readline("question> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("failed to read input"),
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }
        let _ = editor.add_history_entry(question);

        match engine.query(question).await {
            Ok(answer) => print_answer(&answer, show_sources),
            Err(e) => eprintln!("Error: {e}"),
        }
        println!();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = cli.resolve_config()?;
    let client = Arc::new(OllamaClient::new(&config.ollama)?);
    if !cli.skip_service_check {
        check_services(&client, &config.ollama).await.context("Ollama is not ready")?;
    }

    let pipeline = build_pipeline(config, client)?;
    let show_sources = cli.show_sources();

    match &cli.command {
        Command::Ask { question } => {
            let engine = pipeline.query_engine().await.context("failed to prepare the index")?;
            let answer = engine.query(&question.join(" ")).await?;
            print_answer(&answer, show_sources);
        }
        Command::Chat => {
            let engine = pipeline.query_engine().await.context("failed to prepare the index")?;
            chat(&engine, show_sources).await?;
        }
        Command::Index { rebuild } => {
            let (index, origin) = if *rebuild {
                info!("rebuilding index on request");
                (pipeline.rebuild().await?, IndexOrigin::Built)
            } else {
                pipeline.load_or_build().await?
            };
            print_index_stats(&index, origin, pipeline.config());
        }
    }
    Ok(())
}
