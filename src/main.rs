use clap::{Parser, Subcommand};
use docs_rag::Result;
use docs_rag::commands::{
    discover_content, ingest_content, resolve_config_dir, run_chat, search_content,
};
use docs_rag::config::{Config, run_interactive_config, show_config};
use docs_rag::rag::SearchPolicy;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docs-rag")]
#[command(about = "Chat with a local documentation knowledge base using retrieval-augmented generation")]
#[command(version)]
struct Cli {
    /// Configuration directory (defaults to ~/.docs-rag)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Write a manifest of the content files to index
    Discover {
        /// Manifest file to write (defaults to the configured manifest or ./content.json)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Ingest the knowledge base and report what was indexed
    Ingest,
    /// Search the knowledge base for chunks similar to a query
    Search {
        /// Text to search for
        query: String,
        /// Minimum cosine similarity, between 0 and 1
        #[arg(long)]
        min_score: Option<f64>,
        /// Maximum number of results
        #[arg(long)]
        max_results: Option<usize>,
    },
    /// Start an interactive chat grounded in the knowledge base
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = resolve_config_dir(cli.config_dir.as_deref())?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Discover { output } => {
            discover_content(&Config::load(&config_dir)?, output).await?;
        }
        Commands::Ingest => {
            ingest_content(&Config::load(&config_dir)?).await?;
        }
        Commands::Search {
            query,
            min_score,
            max_results,
        } => {
            let config = Config::load(&config_dir)?;
            let policy = SearchPolicy {
                min_score: min_score.unwrap_or(config.retrieval.min_score),
                max_results: max_results.unwrap_or(config.retrieval.max_results),
            };
            search_content(&config, &query, policy).await?;
        }
        Commands::Chat => {
            run_chat(&Config::load(&config_dir)?).await?;
        }
    }

    Ok(())
}
