
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::corpus::Chunk;
use crate::embeddings::Embedder;
use crate::index::{Metric, VectorIndex};
use crate::rerank::Reranker;
use crate::{Result, TalkbackError};

/// Fixed reply used when the best-ranked chunk carries no extractable
/// response.
pub const FALLBACK_RESPONSE: &str = "Let me help you.";

/// Number of index candidates handed to the reranker per query.
pub const DEFAULT_TOP_K: usize = 10;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Candidate count retrieved from the index before reranking.
    pub top_k: usize,
    /// Corpus texts embedded per encoder call during the startup build.
    pub embed_batch_size: usize,
}

impl Default for EngineOptions {
    #[inline]
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            embed_batch_size: 16,
        }
    }
}

/// Retrieval orchestrator: owns the corpus index and composes encoder,
/// index and reranker into a single `answer` operation.
///
/// Construction embeds the whole corpus and is the long-running startup
/// step; afterwards the engine is immutable and serves concurrent queries
/// through `&self` without locking.
pub struct RetrievalEngine {
    encoder: Arc<dyn Embedder>,
    reranker: Arc<dyn Reranker>,
    index: VectorIndex,
    top_k: usize,
}

impl RetrievalEngine {
    /// Embed the corpus and build the retrieval index.
    ///
    /// An empty corpus is a configuration error: the engine refuses to come
    /// up rather than serve queries with no candidates.
    #[inline]
    pub fn build(
        chunks: Vec<Chunk>,
        encoder: Arc<dyn Embedder>,
        reranker: Arc<dyn Reranker>,
        options: &EngineOptions,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(TalkbackError::Config(
                "Corpus produced no conversation chunks; refusing to serve an empty index"
                    .to_string(),
            ));
        }
        if options.top_k == 0 {
            return Err(TalkbackError::Config(
                "top_k must be at least 1".to_string(),
            ));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(texts.len() as u64).with_style(
                ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding corpus")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(options.embed_batch_size.max(1)) {
            embeddings.extend(encoder.embed_batch(batch)?);
            bar.inc(batch.len() as u64);
        }
        bar.finish_and_clear();

        let index = VectorIndex::build(embeddings, chunks, Metric::SquaredEuclidean)?;
        info!(
            "Retrieval index ready: {} chunks, {} dimensions",
            index.len(),
            index.dimension()
        );

        Ok(Self {
            encoder,
            reranker,
            index,
            top_k: options.top_k,
        })
    }

    /// Answer a query from the corpus.
    ///
    /// Embeds the query, retrieves the `top_k` nearest chunks, reranks them
    /// against the raw query text, and extracts the reply from the single
    /// top-scoring chunk. Rerank ties keep the index's ascending-distance
    /// order, so results are reproducible.
    #[inline]
    pub fn answer(&self, query: &str) -> Result<String> {
        let query_embedding = self.encoder.embed(query)?;
        let candidates = self.index.query(&query_embedding, self.top_k)?;

        let Some(best) = self.rerank_top(query, &candidates)? else {
            debug!("No candidates for query; using fallback response");
            return Ok(FALLBACK_RESPONSE.to_string());
        };

        Ok(best
            .response()
            .unwrap_or(FALLBACK_RESPONSE)
            .to_string())
    }

    /// Rerank candidates and pick the top-scoring chunk.
    fn rerank_top<'a>(
        &self,
        query: &str,
        candidates: &[crate::index::Neighbor<'a>],
    ) -> Result<Option<&'a Chunk>> {
        if candidates.is_empty() {
            return Ok(None);
        }

        let texts: Vec<String> = candidates.iter().map(|n| n.chunk.text.clone()).collect();
        let scores = self.reranker.score(query, &texts)?;

        if scores.len() != candidates.len() {
            return Err(TalkbackError::Rerank(format!(
                "Reranker returned {} scores for {} candidates",
                scores.len(),
                candidates.len()
            )));
        }

        // Stable sort keeps ascending-distance order among equal scores.
        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        debug!(
            "Top candidate after rerank: chunk {} (score {})",
            candidates[order[0]].chunk.id, scores[order[0]]
        );
        Ok(Some(candidates[order[0]].chunk))
    }

    /// Number of indexed conversation chunks.
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }

    /// Embedding dimension of the corpus index.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }
}
