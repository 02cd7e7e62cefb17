
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::corpus::Chunk;
use crate::embeddings::Embedder;
use crate::index::{Metric, VectorIndex};
use crate::{Result, TalkbackError};

/// One labeled exemplar phrase for the guardrail index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LabeledSample {
    pub text: String,
    pub label: String,
}

#[derive(Debug, Deserialize)]
struct SampleFile {
    samples: Vec<LabeledSample>,
}

/// Load the exemplar set from its TOML file.
#[inline]
pub fn load_samples<P: AsRef<Path>>(path: P) -> Result<Vec<LabeledSample>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        TalkbackError::Config(format!(
            "Failed to read guardrail samples file {}: {}",
            path.display(),
            e
        ))
    })?;

    let file: SampleFile = toml::from_str(&content).map_err(|e| {
        TalkbackError::Config(format!(
            "Failed to parse guardrail samples file {}: {}",
            path.display(),
            e
        ))
    })?;

    info!(
        "Loaded {} guardrail exemplars from {}",
        file.samples.len(),
        path.display()
    );
    Ok(file.samples)
}

/// Semantic domain gate and topic router.
///
/// Holds its own small cosine index over labeled exemplar phrases, built
/// once at startup. Both operations are stateless lookups; the exemplar
/// set is never exposed as an answer source.
pub struct Guardrail {
    index: VectorIndex,
    labels: Vec<String>,
    threshold: f32,
    encoder: Arc<dyn Embedder>,
}

impl Guardrail {
    /// Embed the exemplar set and freeze it into a cosine index.
    ///
    /// An empty exemplar set is a configuration error, as is a threshold
    /// outside (0, 1).
    #[inline]
    pub fn build(
        samples: Vec<LabeledSample>,
        encoder: Arc<dyn Embedder>,
        threshold: f32,
    ) -> Result<Self> {
        if samples.is_empty() {
            return Err(TalkbackError::Config(
                "Guardrail exemplar set is empty".to_string(),
            ));
        }
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(TalkbackError::Config(format!(
                "Guardrail threshold {} must lie strictly between 0 and 1",
                threshold
            )));
        }

        let texts: Vec<String> = samples.iter().map(|s| s.text.clone()).collect();
        let embeddings = encoder.embed_batch(&texts)?;

        let chunks: Vec<Chunk> = samples
            .iter()
            .enumerate()
            .map(|(id, sample)| Chunk {
                id,
                text: sample.text.clone(),
            })
            .collect();
        let labels: Vec<String> = samples.into_iter().map(|s| s.label).collect();

        let index = VectorIndex::build(embeddings, chunks, Metric::Cosine)?;
        info!(
            "Guardrail ready: {} exemplars, threshold {}",
            index.len(),
            threshold
        );

        Ok(Self {
            index,
            labels,
            threshold,
            encoder,
        })
    }

    /// Whether an utterance belongs to the supported domain.
    ///
    /// Accepts when the maximum cosine similarity against any exemplar
    /// exceeds the configured threshold.
    #[inline]
    pub fn is_in_domain(&self, text: &str) -> Result<bool> {
        let similarity = self.max_similarity(text)?;
        debug!("Max exemplar similarity {:.4} for: {}", similarity, text);
        Ok(similarity > self.threshold)
    }

    /// Highest cosine similarity between the utterance and any exemplar.
    #[inline]
    pub fn max_similarity(&self, text: &str) -> Result<f32> {
        Ok(self.best_match(text)?.1)
    }

    /// Topic label of the single most similar exemplar.
    #[inline]
    pub fn classify(&self, text: &str) -> Result<String> {
        let (id, _) = self.best_match(text)?;
        Ok(self.labels[id].clone())
    }

    fn best_match(&self, text: &str) -> Result<(usize, f32)> {
        let embedding = self.encoder.embed(text)?;
        let nearest = self.index.nearest(&embedding)?.ok_or_else(|| {
            TalkbackError::Config("Guardrail exemplar set is empty".to_string())
        })?;
        Ok((nearest.chunk.id, nearest.similarity()))
    }

    /// Number of exemplars in the frozen index.
    #[inline]
    pub fn exemplar_count(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}
