use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::chat::{ChatSession, is_exit_command, normalize_input};
use crate::config::Config;
use crate::content::{DirectorySource, write_manifest};
use crate::embeddings::{Embedder, OllamaClient};
use crate::indexer::{IndexingStats, Indexer, IngestionEvent};
use crate::rag::{RetrievalAugmenter, SearchPolicy};
use crate::vector_store::VectorStore;

/// Write the sorted list of content files to a JSON manifest
#[inline]
pub async fn discover_content(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let directory = config.content.content_dir();
    let output = output.unwrap_or_else(|| config.content.manifest_path());

    let source = DirectorySource::new(directory, config.content.extension());
    let count = write_manifest(&source, &output)
        .await
        .with_context(|| format!("Failed to discover content in {}", directory.display()))?;

    println!(
        "Discovered {} files -> {}",
        style(count).cyan(),
        style(output.display()).cyan()
    );
    Ok(())
}

/// Ingest the configured knowledge base and report per-file chunk counts
#[inline]
pub async fn ingest_content(config: &Config) -> Result<()> {
    let client = connect(config)?;
    let (store, stats) = build_index(config, &client).await?;

    println!();
    println!("Ingestion complete:");
    println!("  Files processed: {}", stats.documents_processed);
    if stats.documents_failed > 0 {
        println!(
            "  Files skipped: {}",
            style(stats.documents_failed).yellow()
        );
    }
    println!("  Chunks indexed: {}", stats.chunks_indexed);
    println!("  Embedding model: {}", client.embedding_model());
    if let Some(dimension) = store.dimension() {
        println!("  Embedding dimension: {}", dimension);
    }

    Ok(())
}

/// Index the knowledge base, then print the chunks ranked against `query`
#[inline]
pub async fn search_content(config: &Config, query: &str, policy: SearchPolicy) -> Result<()> {
    let client = connect(config)?;
    let (store, _) = build_index(config, &client).await?;

    let augmenter = RetrievalAugmenter::new(policy);
    let results = augmenter.retrieve(&client, &store, query).await?;

    if results.is_empty() {
        println!(
            "No chunks scored at least {} for \"{}\"",
            policy.min_score, query
        );
        return Ok(());
    }

    println!("Found {} results for \"{}\":", results.len(), query);
    println!();
    for (rank, result) in results.iter().enumerate() {
        println!(
            "{}. {} {}",
            rank + 1,
            style(result.metadata.filename().unwrap_or("unknown")).cyan(),
            style(format!("(score {:.3})", result.score)).dim()
        );
        println!("   {}", result.text.replace('\n', "\n   "));
        println!();
    }

    Ok(())
}

/// Interactive chat with retrieval augmentation
#[inline]
pub async fn run_chat(config: &Config) -> Result<()> {
    let client = connect(config)?;
    let (store, _) = build_index(config, &client).await?;

    let augmenter = RetrievalAugmenter::new(config.retrieval);
    let mut session = ChatSession::new(Some(&config.generation.system_prompt));

    eprintln!();
    eprintln!(
        "{}",
        style(format!(
            "💬 Chatting with {} (type 'exit' or 'quit' to leave)",
            client.chat_model()
        ))
        .bold()
        .cyan()
    );

    loop {
        let Some(line) = read_user_input()? else {
            break;
        };
        let input = normalize_input(&line);
        if is_exit_command(input) {
            break;
        }

        match session
            .send(input, &client, &store, &augmenter, &client)
            .await
        {
            Ok(generation) => {
                println!();
                println!("{} {}", style("Assistant:").bold().green(), generation.text.trim());
                if let Some(metrics) = generation.metrics {
                    eprintln!();
                    eprintln!("{}", style(metrics).dim());
                }
                println!();
            }
            Err(e) => {
                eprintln!("{} {}", style("Error:").bold().red(), e);
            }
        }
    }

    eprintln!("Goodbye!");
    Ok(())
}

fn connect(config: &Config) -> Result<OllamaClient> {
    let client = OllamaClient::new(config).context("Failed to create Ollama client")?;
    if let Err(e) = client.health_check() {
        warn!("Ollama health check failed: {:#}", e);
    }
    Ok(client)
}

/// Build an in-memory index of the configured content
#[inline]
pub async fn build_index(
    config: &Config,
    embedder: &dyn Embedder,
) -> Result<(VectorStore, IndexingStats)> {
    let mut store = match config.ollama.embedding_dimension {
        Some(dimension) => VectorStore::with_dimension(dimension)?,
        None => VectorStore::new(),
    };

    let source = config.content.source();
    let indexer = Indexer::new(embedder)
        .with_chunking(config.chunking.clone())
        .with_failure_policy(config.ingestion.on_document_error);

    let bar = if console::user_attended_stderr() {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] Ingesting {msg}")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };

    let stats = indexer
        .ingest_with_progress(source.as_ref(), &mut store, |event| match event {
            IngestionEvent::Started { total_documents } => {
                bar.set_length(total_documents as u64);
                bar.set_position(0);
            }
            IngestionEvent::Indexed {
                relative_path,
                chunks,
            } => {
                bar.suspend(|| println!("Processed file: {} - {} chunks", relative_path, chunks));
                bar.set_message(relative_path.to_string());
                bar.inc(1);
            }
            IngestionEvent::Skipped { relative_path } => {
                bar.suspend(|| {
                    eprintln!("{} {}", style("Skipped file:").yellow(), relative_path);
                });
                bar.inc(1);
            }
        })
        .await
        .with_context(|| format!("Failed to ingest content from {}", source.location()))?;
    bar.finish_and_clear();

    info!(
        "Knowledge base ready: {} chunks from {} files",
        store.len(),
        stats.documents_processed
    );
    Ok((store, stats))
}

fn read_user_input() -> Result<Option<String>> {
    if console::user_attended() {
        let input: String = Input::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()?;
        return Ok(Some(input));
    }

    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok((read > 0).then_some(line))
}

/// Resolve the configuration directory from an optional override
#[inline]
pub fn resolve_config_dir(config_dir: Option<&Path>) -> Result<PathBuf> {
    match config_dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => Ok(crate::config::get_config_dir()?),
    }
}
