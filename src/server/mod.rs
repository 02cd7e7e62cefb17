#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Path as UrlPath, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::TalkbackError;
use crate::engine::RetrievalEngine;
use crate::guardrail::Guardrail;
use crate::sentiment::SentimentClient;
use crate::speech::{TranscriptionClient, TtsClient};

pub const WELCOME_MESSAGE: &str = "Welcome to Talkback! How can I help you today?";
pub const OUT_OF_DOMAIN_MESSAGE: &str =
    "Sorry, I can only help with topics covered by my conversation history.";
pub const INVALID_INPUT_MESSAGE: &str = "Invalid input";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Shared read-only state handed to every request handler.
///
/// Built once at startup, after the retrieval index is complete; no request
/// is accepted before then, and nothing here is mutated afterwards, so the
/// whole state is shared lock-free behind one `Arc`.
pub struct AppState {
    pub engine: Arc<RetrievalEngine>,
    pub guardrail: Arc<Guardrail>,
    pub tts: Option<Arc<TtsClient>>,
    pub transcriber: Option<Arc<TranscriptionClient>>,
    pub sentiment: Option<Arc<SentimentClient>>,
    pub audio_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct AskResponse {
    pub response: String,
    pub audio_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
}

impl AskResponse {
    fn bare(response: &str) -> Self {
        Self {
            response: response.to_string(),
            audio_url: String::new(),
            context: None,
            sentiment: None,
        }
    }
}

/// Build the HTTP router over shared state.
#[inline]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ask", post(ask))
        .route("/ask_audio", post(ask_audio))
        .route("/welcome", get(welcome))
        .route("/static/{filename}", get(serve_audio))
        .with_state(state)
}

/// Bind and serve until the task is cancelled.
#[inline]
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> Result<()> {
    let app = router(state);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Answer server listening on {}", addr);
    axum::serve(listener, app)
        .await
        .context("HTTP server failed")?;
    Ok(())
}

async fn ask(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> (StatusCode, Json<AskResponse>) {
    let query = request.query.trim().to_string();
    if query.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(AskResponse::bare(INVALID_INPUT_MESSAGE)),
        );
    }

    respond_to_query(state, query).await
}

async fn ask_audio(
    State(state): State<Arc<AppState>>,
    audio: Bytes,
) -> (StatusCode, Json<AskResponse>) {
    if audio.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(AskResponse::bare(INVALID_INPUT_MESSAGE)),
        );
    }

    let Some(transcriber) = state.transcriber.clone() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(AskResponse::bare("Speech input is not configured")),
        );
    };

    let transcription =
        tokio::task::spawn_blocking(move || transcriber.transcribe(&audio)).await;

    let query = match transcription {
        Ok(Ok(text)) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(Ok(_)) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(AskResponse::bare(INVALID_INPUT_MESSAGE)),
            );
        }
        Ok(Err(e)) => {
            warn!("Transcription failed: {:#}", e);
            return (
                StatusCode::BAD_GATEWAY,
                Json(AskResponse::bare("Could not transcribe audio")),
            );
        }
        Err(e) => {
            error!("Transcription task failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AskResponse::bare(INTERNAL_ERROR_MESSAGE)),
            );
        }
    };

    respond_to_query(state, query).await
}

async fn welcome(State(state): State<Arc<AppState>>) -> (StatusCode, Json<AskResponse>) {
    let audio_url = synthesize_audio(state, WELCOME_MESSAGE.to_string()).await;
    (
        StatusCode::OK,
        Json(AskResponse {
            response: WELCOME_MESSAGE.to_string(),
            audio_url,
            context: None,
            sentiment: None,
        }),
    )
}

async fn serve_audio(
    State(state): State<Arc<AppState>>,
    UrlPath(filename): UrlPath<String>,
) -> Response {
    if !is_safe_filename(&filename) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let path = state.audio_dir.join(&filename);
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "audio/mpeg")], bytes).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

/// The retrieval chain for one validated query.
///
/// Encoding, search, rerank and synthesis all block on model inference, so
/// the whole chain runs on the blocking pool; the shared state is lock-free,
/// so nothing is held across those calls.
async fn respond_to_query(
    state: Arc<AppState>,
    query: String,
) -> (StatusCode, Json<AskResponse>) {
    let outcome = tokio::task::spawn_blocking(move || build_reply(&state, &query)).await;

    match outcome {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            error!("Retrieval failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AskResponse::bare(INTERNAL_ERROR_MESSAGE)),
            )
        }
        Err(e) => {
            error!("Retrieval task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AskResponse::bare(INTERNAL_ERROR_MESSAGE)),
            )
        }
    }
}

fn build_reply(
    state: &AppState,
    query: &str,
) -> Result<(StatusCode, Json<AskResponse>), TalkbackError> {
    if !state.guardrail.is_in_domain(query)? {
        let audio_url = speak(state, OUT_OF_DOMAIN_MESSAGE);
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(AskResponse {
                response: OUT_OF_DOMAIN_MESSAGE.to_string(),
                audio_url,
                context: None,
                sentiment: None,
            }),
        ));
    }

    let context = match state.guardrail.classify(query) {
        Ok(label) => Some(label),
        Err(e) => {
            warn!("Context classification failed: {}", e);
            None
        }
    };

    let sentiment = state.sentiment.as_ref().and_then(|client| {
        match client.analyze(query) {
            Ok(s) => Some(format!("I understand you're feeling {}.", s.label.to_lowercase())),
            Err(e) => {
                warn!("Sentiment analysis failed: {:#}", e);
                None
            }
        }
    });

    let response = state.engine.answer(query)?;
    let audio_url = speak(state, &response);

    Ok((
        StatusCode::OK,
        Json(AskResponse {
            response,
            audio_url,
            context,
            sentiment,
        }),
    ))
}

/// Synthesize speech for `text`, degrading to an empty URL on any failure.
fn speak(state: &AppState, text: &str) -> String {
    let Some(tts) = &state.tts else {
        return String::new();
    };

    match tts.synthesize(text) {
        Ok(path) => audio_url_for(&path),
        Err(e) => {
            warn!("Speech synthesis failed, responding text-only: {:#}", e);
            String::new()
        }
    }
}

async fn synthesize_audio(state: Arc<AppState>, text: String) -> String {
    match tokio::task::spawn_blocking(move || speak(&state, &text)).await {
        Ok(url) => url,
        Err(e) => {
            error!("Speech task failed: {}", e);
            String::new()
        }
    }
}

fn audio_url_for(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| format!("/static/{}", name))
        .unwrap_or_default()
}

/// Accept only bare filenames: no separators, no parent traversal.
fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains('/')
        && !filename.contains('\\')
        && !filename.contains("..")
}
