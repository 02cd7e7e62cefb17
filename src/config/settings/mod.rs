#[cfg(test)]
mod tests;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub guardrail: GuardrailConfig,
    #[serde(default)]
    pub reranker: RerankerConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Connection settings for the Ollama-compatible embedding server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub batch_size: u32,
}

impl Default for EmbeddingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "nomic-embed-text:latest".to_string(),
            batch_size: 16,
        }
    }
}

/// Guardrail exemplar index settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GuardrailConfig {
    /// Encoder model for the exemplar index; `None` reuses the primary
    /// embedding model.
    pub model: Option<String>,
    /// Minimum cosine similarity against any exemplar for an utterance to
    /// count as in-domain. The two source deployments disagreed (0.3 vs
    /// 0.4); this stays tunable rather than authoritative.
    pub threshold: f32,
    /// Exemplar TOML file, resolved against the config directory when
    /// relative.
    pub samples_file: PathBuf,
}

impl Default for GuardrailConfig {
    #[inline]
    fn default() -> Self {
        Self {
            model: None,
            threshold: 0.35,
            samples_file: PathBuf::from("guardrail.toml"),
        }
    }
}

/// Connection settings for the cross-encoder rerank server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RerankerConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
}

impl Default for RerankerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 8087,
        }
    }
}

/// Text-to-speech and transcription collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    pub tts_url: String,
    pub transcription_url: String,
    pub voice: String,
    pub audio_dir: PathBuf,
    pub max_audio_files: usize,
}

impl Default for SpeechConfig {
    #[inline]
    fn default() -> Self {
        Self {
            enabled: true,
            tts_url: "http://localhost:5002".to_string(),
            transcription_url: "http://localhost:8080".to_string(),
            voice: "en-US-AvaNeural".to_string(),
            audio_dir: PathBuf::from("static"),
            max_audio_files: 5,
        }
    }
}

/// Sentiment collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SentimentConfig {
    pub enabled: bool,
    pub url: String,
}

impl Default for SentimentConfig {
    #[inline]
    fn default() -> Self {
        Self {
            enabled: false,
            url: "http://localhost:9100".to_string(),
        }
    }
}

/// Conversation corpus location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CorpusConfig {
    /// Transcript file, resolved against the config directory when
    /// relative.
    pub path: PathBuf,
}

impl Default for CorpusConfig {
    #[inline]
    fn default() -> Self {
        Self {
            path: PathBuf::from("corpus.txt"),
        }
    }
}

/// HTTP answer server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Index candidates handed to the reranker per query.
    pub top_k: usize,
}

impl Default for ServerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8002,
            top_k: 10,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid guardrail threshold: {0} (must lie strictly between 0 and 1)")]
    InvalidThreshold(f32),
    #[error("Invalid top_k: {0} (must be between 1 and 100)")]
    InvalidTopK(usize),
    #[error("Invalid max audio files: {0} (must be at least 1)")]
    InvalidMaxAudioFiles(usize),
    #[error("Invalid voice name: {0} (cannot be empty)")]
    InvalidVoice(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Platform configuration directory for talkback.
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("talkback"))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load configuration from the platform config directory.
    #[inline]
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_dir()?)
    }

    /// Load configuration rooted at an explicit directory.
    ///
    /// A missing config file yields defaults rather than an error; a
    /// present but invalid file is fatal.
    #[inline]
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    /// Transcript corpus path, resolved against the config directory.
    #[inline]
    pub fn corpus_path(&self) -> PathBuf {
        resolve(&self.base_dir, &self.corpus.path)
    }

    /// Guardrail exemplar file path, resolved against the config directory.
    #[inline]
    pub fn samples_path(&self) -> PathBuf {
        resolve(&self.base_dir, &self.guardrail.samples_file)
    }

    /// Embedding settings for the guardrail encoder role.
    ///
    /// Falls back to the primary encoder model when no dedicated guardrail
    /// model is configured.
    #[inline]
    pub fn guardrail_embedding(&self) -> EmbeddingConfig {
        let mut embedding = self.embedding.clone();
        if let Some(model) = &self.guardrail.model {
            embedding.model = model.clone();
        }
        embedding
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embedding.validate()?;
        self.reranker.validate()?;
        self.speech.validate()?;
        self.sentiment.validate()?;

        let threshold = self.guardrail.threshold;
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        if let Some(model) = &self.guardrail.model {
            if model.trim().is_empty() {
                return Err(ConfigError::InvalidModel(model.clone()));
            }
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort(self.server.port));
        }
        if !(1..=100).contains(&self.server.top_k) {
            return Err(ConfigError::InvalidTopK(self.server.top_k));
        }

        Ok(())
    }
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn validate_endpoint(protocol: &str, host: &str, port: u16) -> Result<Url, ConfigError> {
    if protocol != "http" && protocol != "https" {
        return Err(ConfigError::InvalidProtocol(protocol.to_string()));
    }
    if port == 0 {
        return Err(ConfigError::InvalidPort(port));
    }

    let url_str = format!("{}://{}:{}", protocol, host, port);
    Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
}

impl EmbeddingConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint(&self.protocol, &self.host, self.port)?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }
        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        Ok(())
    }

    #[inline]
    pub fn server_url(&self) -> Result<Url, ConfigError> {
        validate_endpoint(&self.protocol, &self.host, self.port)
    }
}

impl RerankerConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint(&self.protocol, &self.host, self.port).map(|_| ())
    }

    #[inline]
    pub fn server_url(&self) -> Result<Url, ConfigError> {
        validate_endpoint(&self.protocol, &self.host, self.port)
    }
}

impl SpeechConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }

        self.tts_server_url()?;
        self.transcription_server_url()?;

        if self.voice.trim().is_empty() {
            return Err(ConfigError::InvalidVoice(self.voice.clone()));
        }
        if self.max_audio_files == 0 {
            return Err(ConfigError::InvalidMaxAudioFiles(self.max_audio_files));
        }

        Ok(())
    }

    #[inline]
    pub fn tts_server_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.tts_url).map_err(|_| ConfigError::InvalidUrl(self.tts_url.clone()))
    }

    #[inline]
    pub fn transcription_server_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.transcription_url)
            .map_err(|_| ConfigError::InvalidUrl(self.transcription_url.clone()))
    }
}

impl SentimentConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }

        self.server_url().map(|_| ())
    }

    #[inline]
    pub fn server_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.url).map_err(|_| ConfigError::InvalidUrl(self.url.clone()))
    }
}
