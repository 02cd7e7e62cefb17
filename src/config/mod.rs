// Configuration management module
// TOML settings, validation, and the interactive setup flow

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, CorpusConfig, EmbeddingConfig, GuardrailConfig, RerankerConfig,
    SentimentConfig, ServerConfig, SpeechConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
