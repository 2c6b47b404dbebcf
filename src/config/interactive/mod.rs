#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, ConfigError, OllamaConfig};
use crate::content::ContentConfig;
use crate::indexer::FailurePolicy;
use crate::rag::SearchPolicy;

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Docs RAG Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Ollama Configuration").bold().yellow());
    eprintln!("Configure your local Ollama instance for embeddings and chat.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Knowledge Base").bold().yellow());
    configure_content(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Retrieval").bold().yellow());
    configure_retrieval(&mut config.retrieval)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.ollama) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before ingesting.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    eprintln!("  Host: {}", style(&config.ollama.host).cyan());
    eprintln!("  Port: {}", style(config.ollama.port).cyan());
    eprintln!(
        "  Embedding Model: {}",
        style(&config.ollama.embedding_model).cyan()
    );
    eprintln!("  Chat Model: {}", style(&config.ollama.chat_model).cyan());
    eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());
    if let Some(dimension) = config.ollama.embedding_dimension {
        eprintln!("  Embedding Dimension: {}", style(dimension).cyan());
    }

    eprintln!();
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Knowledge Base:").bold().yellow());
    match &config.content {
        ContentConfig::Directory { path, extension } => {
            eprintln!("  Directory: {}", style(path.display()).cyan());
            eprintln!("  Extension: {}", style(extension).cyan());
        }
        ContentConfig::Manifest { path, manifest } => {
            eprintln!("  Directory: {}", style(path.display()).cyan());
            eprintln!("  Manifest: {}", style(manifest.display()).cyan());
        }
    }
    eprintln!(
        "  Minimum Chunk Length: {}",
        style(config.chunking.min_length).cyan()
    );
    eprintln!(
        "  On Document Error: {}",
        style(match config.ingestion.on_document_error {
            FailurePolicy::Abort => "abort",
            FailurePolicy::SkipDocument => "skip document",
        })
        .cyan()
    );

    eprintln!();
    eprintln!("{}", style("Retrieval & Generation:").bold().yellow());
    eprintln!("  Min Score: {}", style(config.retrieval.min_score).cyan());
    eprintln!(
        "  Max Results: {}",
        style(config.retrieval.max_results).cyan()
    );
    eprintln!(
        "  Max New Tokens: {}",
        style(config.generation.max_new_tokens).cyan()
    );
    eprintln!(
        "  Temperature: {}",
        style(config.generation.temperature).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No valid configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            if config.config_file_path().exists() {
                eprintln!("{}", style("Found existing configuration.").green());
            }
            Ok(config)
        },
    )
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            };
            temp_config.validate()?;
            Ok(())
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let embedding_model = prompt_model("Embedding model", &ollama.embedding_model)?;
    let chat_model = prompt_model("Chat model", &ollama.chat_model)?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(ollama.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 1000 {
                Err("Batch size must be 1000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_embedding_model(embedding_model)?;
    ollama.set_chat_model(chat_model)?;
    ollama.set_batch_size(batch_size)?;

    Ok(())
}

fn prompt_model(prompt: &str, current: &str) -> Result<String> {
    let model: String = Input::new()
        .with_prompt(prompt)
        .default(current.to_string())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    Ok(model)
}

fn configure_content(config: &mut Config) -> Result<()> {
    let kinds = &["directory", "manifest"];
    let default_index = usize::from(matches!(config.content, ContentConfig::Manifest { .. }));

    let kind_index = Select::new()
        .with_prompt("Content source")
        .default(default_index)
        .items(kinds)
        .interact()?;

    let path: String = Input::new()
        .with_prompt("Content directory")
        .default(config.content.content_dir().display().to_string())
        .interact_text()?;
    let path = PathBuf::from(path);

    config.content = if kind_index == 0 {
        let current = config.content.extension().to_string();
        let extension: String = Input::new()
            .with_prompt("File extension")
            .default(current)
            .validate_with(|input: &String| -> Result<(), &str> {
                if input.trim_start_matches('.').trim().is_empty() {
                    Err("Extension cannot be empty")
                } else {
                    Ok(())
                }
            })
            .interact_text()?;
        ContentConfig::Directory { path, extension }
    } else {
        let current = config.content.manifest_path().display().to_string();
        let manifest: String = Input::new()
            .with_prompt("Manifest file")
            .default(current)
            .interact_text()?;
        ContentConfig::Manifest {
            path,
            manifest: PathBuf::from(manifest),
        }
    };

    Ok(())
}

fn configure_retrieval(policy: &mut SearchPolicy) -> Result<()> {
    let min_score: f64 = Input::new()
        .with_prompt("Minimum similarity score (0-1)")
        .default(policy.min_score)
        .validate_with(|input: &f64| -> Result<(), &str> {
            if (0.0..=1.0).contains(input) {
                Ok(())
            } else {
                Err("Score must be between 0 and 1")
            }
        })
        .interact_text()?;

    let max_results: usize = Input::new()
        .with_prompt("Maximum chunks per query")
        .default(policy.max_results)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=100).contains(input) {
                Ok(())
            } else {
                Err("Must be between 1 and 100")
            }
        })
        .interact_text()?;

    policy.min_score = min_score;
    policy.max_results = max_results;
    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    let url = format!(
        "{}://{}:{}/api/version",
        ollama.protocol, ollama.host, ollama.port
    );

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}
