use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::corpus;
use crate::embeddings::OllamaClient;
use crate::engine::{EngineOptions, RetrievalEngine};
use crate::guardrail::{self, Guardrail};
use crate::rerank::CrossEncoderClient;
use crate::sentiment::SentimentClient;
use crate::server::{self, AppState};
use crate::speech::{TranscriptionClient, TtsClient};

/// Build the retrieval engine and guardrail from configuration.
///
/// This is the one-time startup step: it embeds the whole corpus and the
/// exemplar set, and any failure here is fatal before serving begins.
fn build_runtime(config: &Config) -> Result<(Arc<RetrievalEngine>, Arc<Guardrail>)> {
    let encoder =
        OllamaClient::new(&config.embedding).context("Failed to create embedding client")?;
    encoder
        .health_check()
        .context("Embedding server health check failed")?;

    let guardrail_encoder = OllamaClient::new(&config.guardrail_embedding())
        .context("Failed to create guardrail embedding client")?;
    if config.guardrail.model.is_some() {
        guardrail_encoder
            .validate_model()
            .context("Guardrail model validation failed")?;
    }

    let reranker =
        CrossEncoderClient::new(&config.reranker).context("Failed to create rerank client")?;
    match reranker.ping() {
        Ok(()) => info!("Rerank server reachable"),
        Err(e) => warn!("Rerank server unreachable at startup: {:#}", e),
    }

    let corpus_path = config.corpus_path();
    let chunks = corpus::load_corpus(&corpus_path)?;

    let options = EngineOptions {
        top_k: config.server.top_k,
        embed_batch_size: config.embedding.batch_size as usize,
    };
    let engine = RetrievalEngine::build(chunks, Arc::new(encoder), Arc::new(reranker), &options)?;

    let samples = guardrail::load_samples(config.samples_path())?;
    let guardrail = Guardrail::build(
        samples,
        Arc::new(guardrail_encoder),
        config.guardrail.threshold,
    )?;

    Ok((Arc::new(engine), Arc::new(guardrail)))
}

fn build_state(config: &Config) -> Result<Arc<AppState>> {
    let (engine, guardrail) = build_runtime(config)?;

    let (tts, transcriber) = if config.speech.enabled {
        let tts = TtsClient::new(&config.speech).context("Failed to create TTS client")?;
        let transcriber = TranscriptionClient::new(&config.speech)
            .context("Failed to create transcription client")?;
        (Some(Arc::new(tts)), Some(Arc::new(transcriber)))
    } else {
        (None, None)
    };

    let sentiment = if config.sentiment.enabled {
        Some(Arc::new(
            SentimentClient::new(&config.sentiment)
                .context("Failed to create sentiment client")?,
        ))
    } else {
        None
    };

    Ok(Arc::new(AppState {
        engine,
        guardrail,
        tts,
        transcriber,
        sentiment,
        audio_dir: config.speech.audio_dir.clone(),
    }))
}

/// Start the HTTP answer server.
#[inline]
pub async fn serve(port: Option<u16>) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(port) = port {
        config.server.port = port;
    }

    println!("📦 Loading models and building the retrieval index...");
    let state = match build_state(&config) {
        Ok(state) => state,
        Err(e) => {
            error!("Startup failed: {:#}", e);
            println!("Error: {:#}", e);
            println!("Use 'talkback config' to review collaborator settings.");
            return Err(e);
        }
    };
    println!(
        "✅ Index ready: {} chunks, {} guardrail exemplars",
        state.engine.chunk_count(),
        state.guardrail.exemplar_count()
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid server address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    println!("🌐 Serving answers on http://{}", addr);
    println!("Press Ctrl+C to stop the server");

    tokio::select! {
        result = server::serve(state, addr) => result,
        _ = tokio::signal::ctrl_c() => {
            println!("\n📴 Received interrupt signal, shutting down...");
            Ok(())
        }
    }
}

/// Answer a single query from the command line, without the HTTP layer.
#[inline]
pub fn ask(query: String) -> Result<()> {
    let query = query.trim().to_string();
    if query.is_empty() {
        println!("Query must not be empty.");
        return Ok(());
    }

    let config = Config::load().context("Failed to load configuration")?;

    println!("📦 Loading models and building the retrieval index...");
    let (engine, guardrail) = build_runtime(&config)?;

    if !guardrail.is_in_domain(&query)? {
        println!("{}", crate::server::OUT_OF_DOMAIN_MESSAGE);
        return Ok(());
    }

    let context = guardrail.classify(&query)?;
    let answer = engine.answer(&query)?;

    println!();
    println!("{}", answer);
    println!("(context: {})", context);

    Ok(())
}

/// Show collaborator and corpus status.
#[inline]
pub fn show_status() -> Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("📊 Talkback Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🤖 Embedding Server:");
    match OllamaClient::new(&config.embedding) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Connected ({}:{})",
                    config.embedding.host, config.embedding.port
                );
                println!("   📋 Model: {}", config.embedding.model);
                println!("   🔢 Batch Size: {}", config.embedding.batch_size);
            }
            Err(e) => {
                println!("   ⚠️  Reachable but unhealthy - {:#}", e);
            }
        },
        Err(e) => {
            println!("   ❌ Failed to configure client - {:#}", e);
        }
    }

    println!();
    println!("🎯 Rerank Server:");
    match CrossEncoderClient::new(&config.reranker) {
        Ok(client) => match client.ping() {
            Ok(()) => println!(
                "   ✅ Connected ({}:{})",
                config.reranker.host, config.reranker.port
            ),
            Err(e) => println!("   ❌ Unreachable - {:#}", e),
        },
        Err(e) => println!("   ❌ Failed to configure client - {:#}", e),
    }

    println!();
    println!("📚 Corpus:");
    let corpus_path = config.corpus_path();
    match corpus::load_corpus(&corpus_path) {
        Ok(chunks) => {
            println!("   ✅ {} ({} chunks)", corpus_path.display(), chunks.len());
            if chunks.is_empty() {
                println!("   ⚠️  Empty corpus: the server will refuse to start");
            }
        }
        Err(e) => println!("   ❌ {} - {:#}", corpus_path.display(), e),
    }

    println!();
    println!("🛡️  Guardrail:");
    let samples_path = config.samples_path();
    match guardrail::load_samples(&samples_path) {
        Ok(samples) => {
            println!(
                "   ✅ {} ({} exemplars)",
                samples_path.display(),
                samples.len()
            );
            println!("   🎚️  Threshold: {}", config.guardrail.threshold);
        }
        Err(e) => println!("   ❌ {} - {}", samples_path.display(), e),
    }

    println!();
    println!("🔊 Speech:");
    if config.speech.enabled {
        println!("   ✅ Enabled (voice: {})", config.speech.voice);
        println!("   🗣️  TTS: {}", config.speech.tts_url);
        println!("   🎤 Transcription: {}", config.speech.transcription_url);
    } else {
        println!("   💤 Disabled (text-only responses)");
    }

    println!();
    println!("💬 Sentiment:");
    if config.sentiment.enabled {
        println!("   ✅ Enabled ({})", config.sentiment.url);
    } else {
        println!("   💤 Disabled");
    }

    println!();
    println!("💡 Next Steps:");
    println!("   • Use 'talkback config' to adjust collaborator settings");
    println!("   • Use 'talkback ask <query>' for a one-shot answer");
    println!("   • Use 'talkback serve' to start the HTTP answer server");

    Ok(())
}
