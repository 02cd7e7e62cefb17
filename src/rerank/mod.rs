#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::TalkbackError;
use crate::config::RerankerConfig;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Pairwise relevance scorer.
///
/// Returns one score per candidate, in candidate order; higher means more
/// relevant to the query. A pure function of its inputs: identical
/// (query, candidates) pairs must score identically.
pub trait Reranker: Send + Sync {
    fn score(&self, query: &str, candidates: &[String]) -> crate::Result<Vec<f32>>;
}

/// HTTP client for a cross-encoder rerank server.
///
/// Speaks the `POST /rerank` protocol of text-embeddings-inference style
/// servers: the response lists `(index, score)` pairs in the server's own
/// ranking order, which this client restores to input order.
#[derive(Debug, Clone)]
pub struct CrossEncoderClient {
    base_url: Url,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [String],
    raw_scores: bool,
}

#[derive(Debug, Deserialize)]
struct RankedEntry {
    index: usize,
    score: f32,
}

impl CrossEncoderClient {
    #[inline]
    pub fn new(config: &RerankerConfig) -> Result<Self> {
        let base_url = config
            .server_url()
            .context("Failed to build rerank server URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Check that the rerank server responds on its health endpoint.
    #[inline]
    pub fn ping(&self) -> Result<()> {
        let url = self
            .base_url
            .join("/health")
            .context("Failed to build health URL")?;

        self.agent
            .get(url.as_str())
            .call()
            .context("Failed to reach rerank server")?;
        Ok(())
    }

    /// Score every candidate against the query, preserving candidate order.
    #[inline]
    pub fn rerank(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Reranking {} candidates", candidates.len());

        let url = self
            .base_url
            .join("/rerank")
            .context("Failed to build rerank URL")?;

        let request = RerankRequest {
            query,
            texts: candidates,
            raw_scores: true,
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize rerank request")?;

        let body = self
            .request_with_retry(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Rerank request failed")?;

        let entries: Vec<RankedEntry> =
            serde_json::from_str(&body).context("Failed to parse rerank response")?;

        scores_in_input_order(&entries, candidates.len())
    }

    fn request_with_retry<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            match request_fn() {
                Ok(body) => return Ok(body),
                Err(error) => {
                    let retryable = match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 {
                                true
                            } else {
                                return Err(anyhow::anyhow!("Client error: HTTP {}", status));
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => true,
                        _ => false,
                    };

                    if !retryable {
                        return Err(anyhow::anyhow!("Non-retryable error: {}", error));
                    }

                    warn!(
                        "Rerank request failed (attempt {}/{}): {}",
                        attempt, self.retry_attempts, error
                    );
                    last_error = Some(anyhow::anyhow!("Request error: {}", error));

                    if attempt < self.retry_attempts {
                        let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                        std::thread::sleep(Duration::from_millis(delay_ms));
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Request failed after retries")))
    }
}

/// Restore server-ranked `(index, score)` entries to candidate input order.
fn scores_in_input_order(entries: &[RankedEntry], candidate_count: usize) -> Result<Vec<f32>> {
    if entries.len() != candidate_count {
        return Err(anyhow::anyhow!(
            "Rerank server returned {} scores for {} candidates",
            entries.len(),
            candidate_count
        ));
    }

    let mut scores = vec![None; candidate_count];
    for entry in entries {
        let slot = scores.get_mut(entry.index).ok_or_else(|| {
            anyhow::anyhow!(
                "Rerank result index {} out of range for {} candidates",
                entry.index,
                candidate_count
            )
        })?;
        if slot.replace(entry.score).is_some() {
            return Err(anyhow::anyhow!(
                "Rerank result index {} reported twice",
                entry.index
            ));
        }
    }

    // Every slot is filled: counts match and no index repeated.
    Ok(scores.into_iter().flatten().collect())
}

impl Reranker for CrossEncoderClient {
    #[inline]
    fn score(&self, query: &str, candidates: &[String]) -> crate::Result<Vec<f32>> {
        self.rerank(query, candidates)
            .map_err(|e| TalkbackError::Rerank(format!("{e:#}")))
    }
}
