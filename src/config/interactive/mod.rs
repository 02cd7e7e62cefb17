use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, EmbeddingConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 Talkback Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Embedding Server").bold().yellow());
    eprintln!("Configure the Ollama-compatible server used to encode the corpus and queries.");
    eprintln!();
    configure_embedding(&mut config.embedding)?;

    eprintln!();
    eprintln!("{}", style("Guardrail").bold().yellow());
    let threshold: f32 = Input::new()
        .with_prompt("Domain similarity threshold (0-1, exclusive)")
        .default(config.guardrail.threshold)
        .validate_with(|input: &f32| -> Result<(), &str> {
            if *input > 0.0 && *input < 1.0 {
                Ok(())
            } else {
                Err("Threshold must lie strictly between 0 and 1")
            }
        })
        .interact_text()?;
    config.guardrail.threshold = threshold;

    eprintln!();
    eprintln!("{}", style("Rerank Server").bold().yellow());
    let rerank_host: String = Input::new()
        .with_prompt("Rerank server host")
        .default(config.reranker.host.clone())
        .interact_text()?;
    let rerank_port: u16 = Input::new()
        .with_prompt("Rerank server port")
        .default(config.reranker.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    config.reranker.host = rerank_host;
    config.reranker.port = rerank_port;

    eprintln!();
    eprintln!("{}", style("Speech").bold().yellow());
    config.speech.enabled = Confirm::new()
        .with_prompt("Enable text-to-speech responses?")
        .default(config.speech.enabled)
        .interact()?;
    if config.speech.enabled {
        config.speech.tts_url = Input::new()
            .with_prompt("TTS server URL")
            .default(config.speech.tts_url.clone())
            .interact_text()?;
        config.speech.voice = Input::new()
            .with_prompt("Voice name")
            .default(config.speech.voice.clone())
            .interact_text()?;
    }

    config
        .validate()
        .context("Configuration validation failed")?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());
    if test_embedding_connection(&config.embedding) {
        eprintln!("{}", style("✓ Embedding server reachable!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not reach the embedding server").yellow()
        );
        eprintln!("You can continue, but make sure it is running before serving.");
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
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding Server:").bold().yellow());
    eprintln!("  Host: {}", style(&config.embedding.host).cyan());
    eprintln!("  Port: {}", style(config.embedding.port).cyan());
    eprintln!("  Model: {}", style(&config.embedding.model).cyan());
    eprintln!("  Batch Size: {}", style(config.embedding.batch_size).cyan());

    eprintln!();
    eprintln!("{}", style("Guardrail:").bold().yellow());
    let guardrail_model = config
        .guardrail
        .model
        .clone()
        .unwrap_or_else(|| format!("{} (primary)", config.embedding.model));
    eprintln!("  Model: {}", style(guardrail_model).cyan());
    eprintln!("  Threshold: {}", style(config.guardrail.threshold).cyan());
    eprintln!(
        "  Samples: {}",
        style(config.samples_path().display()).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Rerank Server:").bold().yellow());
    eprintln!("  Host: {}", style(&config.reranker.host).cyan());
    eprintln!("  Port: {}", style(config.reranker.port).cyan());

    eprintln!();
    eprintln!("{}", style("Speech:").bold().yellow());
    eprintln!("  Enabled: {}", style(config.speech.enabled).cyan());
    eprintln!("  TTS URL: {}", style(&config.speech.tts_url).cyan());
    eprintln!("  Voice: {}", style(&config.speech.voice).cyan());
    eprintln!(
        "  Audio Dir: {}",
        style(config.speech.audio_dir.display()).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Corpus:").bold().yellow());
    eprintln!("  Path: {}", style(config.corpus_path().display()).cyan());

    eprintln!();
    eprintln!("{}", style("Server:").bold().yellow());
    eprintln!(
        "  Bind: {}:{}",
        style(&config.server.host).cyan(),
        style(config.server.port).cyan()
    );
    eprintln!("  Top K: {}", style(config.server.top_k).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    Config::load().map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: Config::config_dir()?,
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_embedding(embedding: &mut EmbeddingConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == embedding.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Embedding server protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;
    embedding.protocol = protocols[protocol_index].to_string();

    embedding.host = Input::new()
        .with_prompt("Embedding server host")
        .default(embedding.host.clone())
        .interact_text()?;

    embedding.port = Input::new()
        .with_prompt("Embedding server port")
        .default(embedding.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    embedding.model = Input::new()
        .with_prompt("Embedding model")
        .default(embedding.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    embedding.batch_size = Input::new()
        .with_prompt("Batch size for corpus embedding")
        .default(embedding.batch_size)
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

    Ok(())
}

fn test_embedding_connection(embedding: &EmbeddingConfig) -> bool {
    let url = format!(
        "{}://{}:{}/api/tags",
        embedding.protocol, embedding.host, embedding.port
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
