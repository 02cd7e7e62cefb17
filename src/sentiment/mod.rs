
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::SentimentConfig;

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// A sentiment judgment over one utterance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Sentiment {
    pub label: String,
    pub score: f32,
}

/// HTTP client for a sentiment classification server.
///
/// Purely additive: the label decorates responses on the guardrail path
/// and never gates retrieval. Callers drop the sentiment field when this
/// client fails.
#[derive(Debug, Clone)]
pub struct SentimentClient {
    base_url: Url,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

impl SentimentClient {
    #[inline]
    pub fn new(config: &SentimentConfig) -> Result<Self> {
        let base_url = config
            .server_url()
            .context("Failed to build sentiment server URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self { base_url, agent })
    }

    /// Classify the sentiment of one utterance.
    #[inline]
    pub fn analyze(&self, text: &str) -> Result<Sentiment> {
        let url = self
            .base_url
            .join("/classify")
            .context("Failed to build classify URL")?;

        let request = ClassifyRequest { text };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize classify request")?;

        let body = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .context("Sentiment request failed")?;

        let sentiment: Sentiment =
            serde_json::from_str(&body).context("Failed to parse sentiment response")?;

        debug!(
            "Sentiment for utterance: {} ({:.3})",
            sentiment.label, sentiment.score
        );
        Ok(sentiment)
    }
}
