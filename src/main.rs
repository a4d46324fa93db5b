use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::{Config, EmbeddingProvider};

use dealflow::crawler::{Crawler, HttpCrawler};
use dealflow::domain::{ProfileKind, ProfileRecord};
use dealflow::embed::{Embedder, HashEmbedder, HttpEmbedder, HttpEmbedderConfig};
use dealflow::llm::{AnthropicClient, AnthropicConfig, LlmClient};
use dealflow::orchestrator::Orchestrator;
use dealflow::store::{Deduplicator, ProfileStore, ResolveOutcome};

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dealflow")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("dealflow.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn build_llm(config: &Config) -> Result<Arc<dyn LlmClient>> {
    let client = AnthropicClient::new(AnthropicConfig {
        model: config.llm.model.clone(),
        max_tokens: config.llm.max_tokens,
        timeout: Duration::from_millis(config.llm.timeout_ms),
    })
    .context("Failed to build LLM client")?;
    Ok(Arc::new(client))
}

fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    match config.embedding.provider {
        EmbeddingProvider::Api => {
            let embedder = HttpEmbedder::new(HttpEmbedderConfig {
                endpoint: config.embedding.endpoint.clone(),
                model: config.embedding.model.clone(),
                ..Default::default()
            })
            .context("Failed to build embedding client")?;
            Ok(Arc::new(embedder))
        }
        EmbeddingProvider::Hash => Ok(Arc::new(HashEmbedder::new())),
    }
}

async fn run_pipeline(config: &Config, limit: Option<usize>) -> Result<()> {
    let store = ProfileStore::open(&config.storage.db_path).context("Failed to open profile store")?;
    let llm = build_llm(config)?;
    let embedder = build_embedder(config)?;
    let crawler: Arc<dyn Crawler> = Arc::new(
        HttpCrawler::new(config.discovery.listing_url.clone()).context("Failed to build crawler")?,
    );

    let orchestrator = Orchestrator::new(
        store,
        llm,
        embedder,
        crawler,
        limit.unwrap_or(config.discovery.limit),
        config.report.output_dir.clone(),
    );

    println!("{}", "Running analysis pipeline...".cyan());
    let state = orchestrator.run().await.context("Pipeline run failed")?;

    for entry in &state.decision_log {
        let verdict = if entry.approved {
            "approve".green()
        } else {
            "reject".red()
        };
        println!("  {} {} (score {})", verdict, entry.name, entry.final_score);
    }
    match &state.last_report_path {
        Some(path) => println!("{} {}", "Report:".green(), path.display()),
        None => println!("{}", "No report file written".yellow()),
    }
    Ok(())
}

async fn resolve_candidate(config: &Config, name: &str) -> Result<()> {
    let store = ProfileStore::open(&config.storage.db_path).context("Failed to open profile store")?;
    let embedder = build_embedder(config)?;
    let dedup = Deduplicator::new(&store, embedder.as_ref());

    match dedup.resolve(name).await.context("Resolution failed")? {
        ResolveOutcome::Exists { id, distance } => {
            println!("{} {} -> {}", "Exists:".yellow(), name, id);
            if let Some(distance) = distance {
                println!("  similarity distance: {distance:.4}");
            }
        }
        ResolveOutcome::New => println!("{} {}", "New:".green(), name),
    }
    Ok(())
}

fn peek_profiles(config: &Config, kind: Option<&str>, limit: usize) -> Result<()> {
    let kind = match kind {
        Some(raw) => Some(
            ProfileKind::parse(raw).ok_or_else(|| eyre::eyre!("Unknown profile kind: {raw}"))?,
        ),
        None => None,
    };

    let store = ProfileStore::open(&config.storage.db_path).context("Failed to open profile store")?;
    let records = store.list(kind, limit).context("Failed to list profiles")?;
    if records.is_empty() {
        println!("{}", "No profiles stored".yellow());
        return Ok(());
    }

    for record in records {
        let tags = if record.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", record.tags_joined())
        };
        println!(
            "{} {} ({}){}",
            record.kind.as_str().cyan(),
            record.name.bold(),
            record.id,
            tags
        );
        if let Some(summary) = record.sections.get("summary") {
            let excerpt: String = summary.chars().take(120).collect();
            println!("    {excerpt}");
        }
    }
    Ok(())
}

async fn preview_queue(config: &Config) -> Result<()> {
    let store = ProfileStore::open(&config.storage.db_path).context("Failed to open profile store")?;
    let embedder = build_embedder(config)?;
    let crawler = HttpCrawler::new(config.discovery.listing_url.clone()).context("Failed to build crawler")?;

    let listings = crawler
        .list_candidates(config.discovery.limit)
        .await
        .context("Listing fetch failed")?;
    if listings.is_empty() {
        println!("{}", "Discovery source returned no candidates".yellow());
        return Ok(());
    }

    let dedup = Deduplicator::new(&store, embedder.as_ref());
    for listing in &listings {
        match dedup.resolve(&listing.name).await {
            Ok(ResolveOutcome::New) => println!("  {} {}", "new".green(), listing.name),
            Ok(ResolveOutcome::Exists { id, .. }) => {
                println!("  {} {} (stored as {id})", "dup".yellow(), listing.name)
            }
            Err(e) => println!("  {} {} ({e})", "err".red(), listing.name),
        }
    }
    Ok(())
}

async fn ingest_industry(
    config: &Config,
    sector: &str,
    title: &str,
    file: &PathBuf,
    source_url: Option<String>,
) -> Result<()> {
    let body = fs::read_to_string(file).context(format!("Failed to read {}", file.display()))?;
    let record = ProfileRecord::industry(sector, title, body, source_url);

    let store = ProfileStore::open(&config.storage.db_path).context("Failed to open profile store")?;
    let embedder = build_embedder(config)?;
    let embedding = embedder
        .embed(&record.document_text())
        .await
        .context("Embedding failed")?;

    let id = store
        .upsert(&record, Some(&embedding), true)
        .context("Failed to store industry report")?;
    println!("{} {} -> {}", "Ingested:".green(), title, id);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        None => run_pipeline(&config, None).await,
        Some(Commands::Run { limit }) => run_pipeline(&config, *limit).await,
        Some(Commands::Resolve { name }) => resolve_candidate(&config, name).await,
        Some(Commands::Peek { kind, limit }) => peek_profiles(&config, kind.as_deref(), *limit),
        Some(Commands::Queue) => preview_queue(&config).await,
        Some(Commands::IngestIndustry { sector, title, file, source_url }) => {
            ingest_industry(&config, sector, title, file, source_url.clone()).await
        }
    }
}
