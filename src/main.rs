use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use ragline::api::AppState;
use ragline::assistant::AssistantService;
use ragline::config::AppConfig;
use ragline::inference::InferenceClient;
use ragline::inference::TextEmbedder;
use ragline::retrieval::RetrievalEngine;
use ragline::seed::SeedFile;
use ragline::store::KnowledgeStore;
use ragline::Result;
use tracing::info;
use tracing::warn;

#[derive(Parser)]
#[command(name = "ragline")]
#[command(about = "Retrieval-augmented assistant backend over a curated knowledge corpus")]
#[command(version)]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Bind host (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides config)
        #[arg(long)]
        port: Option<u16>,
        /// Enable or disable permissive CORS (overrides config)
        #[arg(long)]
        cors: Option<bool>,
    },
    /// Embed and upsert a seed corpus into the knowledge store
    Seed {
        /// Seed file path (default: seeds.toml, then seeds.example.toml)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Ask the assistant a single question and print the reply
    Ask {
        question: String,
        /// Skip retrieval, generation-only
        #[arg(long)]
        no_rag: bool,
    },
    /// Embed a query and print the scored retrieval results
    Search {
        query: String,
        /// Number of results
        #[arg(short, default_value = "3")]
        k: usize,
    },
    /// Show current configuration (secrets redacted)
    Config,
}

/// Connect the knowledge store; a failure disables retrieval and upsert
/// instead of aborting startup.
async fn connect_store(config: &AppConfig) -> Option<Arc<KnowledgeStore>> {
    match KnowledgeStore::connect(config).await {
        Ok(store) => {
            info!("Connected to knowledge store");
            Some(Arc::new(store))
        }
        Err(e) => {
            warn!(
                "Could not connect to knowledge store - retrieval and upsert disabled. \
                 Check [database] url in config.toml. Reason: {e}"
            );
            None
        }
    }
}

fn build_assistant(
    config: &AppConfig,
    inference: &Arc<InferenceClient>,
    store: Option<&Arc<KnowledgeStore>>,
) -> Arc<AssistantService> {
    let engine = store.map(|s| {
        Arc::new(RetrievalEngine::new(
            s.clone(),
            config.fallback_index().to_string(),
        ))
    });

    Arc::new(AssistantService::new(
        inference.clone(),
        inference.clone(),
        engine,
        config.retrieval.clone(),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?;

    if cli.verbose {
        ragline::logging::init_logging_with_level("debug")?;
    } else {
        ragline::logging::init_logging(&config)?;
    }

    match cli.command {
        Commands::Serve { host, port, cors } => {
            let inference = Arc::new(InferenceClient::new(&config)?);
            let store = connect_store(&config).await;
            let assistant = build_assistant(&config, &inference, store.as_ref());

            let state = AppState {
                assistant,
                store,
                inference,
            };

            let host = host.unwrap_or_else(|| config.server_host().to_string());
            let port = port.unwrap_or_else(|| config.server_port());
            let cors = cors.unwrap_or_else(|| config.cors_enabled());
            ragline::api::serve_api(state, &host, port, cors).await
        }
        Commands::Seed { file } => {
            let inference = InferenceClient::new(&config)?;
            let store = KnowledgeStore::connect(&config).await?;

            let seeds = match file {
                Some(path) => SeedFile::from_file(path)?,
                None => SeedFile::load()?,
            };

            let report = ragline::seed::run_seed(&store, &inference, &seeds).await?;
            println!(
                "Seeding complete: inserted {}, updated {}",
                report.inserted, report.updated
            );
            Ok(())
        }
        Commands::Ask { question, no_rag } => {
            let inference = Arc::new(InferenceClient::new(&config)?);
            let store = connect_store(&config).await;
            let assistant = build_assistant(&config, &inference, store.as_ref());

            let reply = assistant.respond(&question, !no_rag).await;
            println!("{}", reply.reply);
            if !reply.sources.is_empty() {
                println!("\nSources:");
                for (idx, hit) in reply.sources.iter().enumerate() {
                    println!("  {}. {} (score: {:.3})", idx + 1, hit.question, hit.score);
                }
            }
            Ok(())
        }
        Commands::Search { query, k } => {
            let inference = InferenceClient::new(&config)?;
            let store = Arc::new(KnowledgeStore::connect(&config).await?);
            let engine = RetrievalEngine::new(store, config.fallback_index().to_string());

            let vector = inference.embed(&query).await?;
            let hits = engine.search(&vector, k).await?;

            if hits.is_empty() {
                println!("No results.");
            }
            for (idx, hit) in hits.iter().enumerate() {
                println!("{}. [{:.3}] Q: {}", idx + 1, hit.score, hit.question);
                println!("   A: {}", hit.answer);
                if let Some(comment) = &hit.comment {
                    println!("   # {comment}");
                }
            }
            Ok(())
        }
        Commands::Config => {
            let mut redacted = config.clone();
            if !redacted.inference.api_key.is_empty() {
                redacted.inference.api_key = "***".to_string();
            }
            let rendered = toml::to_string_pretty(&redacted).map_err(|e| {
                ragline::RaglineError::Config(format!("could not render config: {e}"))
            })?;
            println!("{rendered}");
            Ok(())
        }
    }
}
