use thiserror::Error;

pub type Result<T> = std::result::Result<T, TalkbackError>;

#[derive(Error, Debug)]
pub enum TalkbackError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Rerank error: {0}")]
    Rerank(String),

    #[error("Speech error: {0}")]
    Speech(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Sentiment error: {0}")]
    Sentiment(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod engine;
pub mod guardrail;
pub mod index;
pub mod rerank;
pub mod sentiment;
pub mod server;
pub mod speech;
