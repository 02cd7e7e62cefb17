
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::SpeechConfig;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const AUDIO_PREFIX: &str = "response_";
const AUDIO_EXTENSION: &str = ".mp3";

/// HTTP client for a text-to-speech server.
///
/// Synthesized audio lands in the configured directory as a timestamped
/// MP3; old files are pruned so the directory never grows past
/// `max_audio_files`. The retrieval path treats this whole client as
/// fire-and-forget: a synthesis failure degrades the response to text-only.
#[derive(Debug, Clone)]
pub struct TtsClient {
    base_url: Url,
    voice: String,
    audio_dir: PathBuf,
    max_audio_files: usize,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    voice: &'a str,
}

impl TtsClient {
    #[inline]
    pub fn new(config: &SpeechConfig) -> Result<Self> {
        let base_url = config
            .tts_server_url()
            .context("Failed to build TTS server URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            voice: config.voice.clone(),
            audio_dir: config.audio_dir.clone(),
            max_audio_files: config.max_audio_files,
            agent,
        })
    }

    /// Directory where synthesized audio files are written.
    #[inline]
    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    /// Synthesize speech for `text` and write it to a fresh audio file.
    ///
    /// Returns the path of the written MP3.
    #[inline]
    pub fn synthesize(&self, text: &str) -> Result<PathBuf> {
        debug!("Synthesizing speech ({} chars)", text.len());

        let url = self
            .base_url
            .join("/api/tts")
            .context("Failed to build TTS URL")?;

        let request = SynthesizeRequest {
            text,
            voice: &self.voice,
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize TTS request")?;

        let audio = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_vec())
            .context("TTS request failed")?;

        fs::create_dir_all(&self.audio_dir).with_context(|| {
            format!(
                "Failed to create audio directory: {}",
                self.audio_dir.display()
            )
        })?;

        let path = self.audio_dir.join(unique_audio_filename());
        fs::write(&path, audio)
            .with_context(|| format!("Failed to write audio file: {}", path.display()))?;

        info!("Wrote synthesized audio to {}", path.display());
        cleanup_old_audio(&self.audio_dir, self.max_audio_files);
        Ok(path)
    }
}

/// Timestamped audio filename, unique per response.
fn unique_audio_filename() -> String {
    format!(
        "{}{}{}",
        AUDIO_PREFIX,
        Utc::now().timestamp_millis(),
        AUDIO_EXTENSION
    )
}

/// Keep only the newest `max_files` generated audio files in `dir`.
///
/// Only files matching the generated `response_*.mp3` pattern are touched.
/// Failures are logged and swallowed: audio housekeeping must never take
/// down a response.
#[inline]
pub fn cleanup_old_audio(dir: &Path, max_files: usize) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read audio directory {}: {}", dir.display(), e);
            return;
        }
    };

    let mut generated: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| {
                    name.starts_with(AUDIO_PREFIX) && name.ends_with(AUDIO_EXTENSION)
                })
        })
        .collect();

    if generated.len() <= max_files {
        return;
    }

    // Newest last: modification time, with the filename (which embeds the
    // creation timestamp) as the tie-break.
    generated.sort_by_key(|path| {
        let mtime = fs::metadata(path).and_then(|m| m.modified()).ok();
        (mtime, path.clone())
    });

    let excess = generated.len() - max_files;
    for path in generated.into_iter().take(excess) {
        match fs::remove_file(&path) {
            Ok(()) => debug!("Removed old audio file {}", path.display()),
            Err(e) => warn!("Failed to remove old audio file {}: {}", path.display(), e),
        }
    }
}

/// HTTP client for a speech-to-text server.
///
/// An alternate input channel: transcribed text feeds the same answer
/// contract as typed queries.
#[derive(Debug, Clone)]
pub struct TranscriptionClient {
    base_url: Url,
    agent: ureq::Agent,
}

#[derive(Debug, serde::Deserialize)]
struct TranscribeResponse {
    text: String,
}

impl TranscriptionClient {
    #[inline]
    pub fn new(config: &SpeechConfig) -> Result<Self> {
        let base_url = config
            .transcription_server_url()
            .context("Failed to build transcription server URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self { base_url, agent })
    }

    /// Transcribe recorded audio into query text.
    #[inline]
    pub fn transcribe(&self, audio: &[u8]) -> Result<String> {
        debug!("Transcribing {} bytes of audio", audio.len());

        let url = self
            .base_url
            .join("/inference")
            .context("Failed to build transcription URL")?;

        let body = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/octet-stream")
            .send(audio)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .context("Transcription request failed")?;

        let response: TranscribeResponse =
            serde_json::from_str(&body).context("Failed to parse transcription response")?;

        Ok(response.text.trim().to_string())
    }
}
