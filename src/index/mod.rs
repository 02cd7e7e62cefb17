#[cfg(test)]
mod tests;

use tracing::debug;

use crate::corpus::Chunk;
use crate::{Result, TalkbackError};

/// Distance metric used by a [`VectorIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Squared Euclidean distance; smaller is closer. Used for the main
    /// conversation corpus.
    SquaredEuclidean,
    /// Cosine similarity, reported as the distance `1 - cos`. Used for the
    /// guardrail exemplar index, where thresholding happens on the bounded
    /// similarity scale.
    Cosine,
}

/// A single nearest-neighbor result.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor<'a> {
    pub chunk: &'a Chunk,
    pub distance: f32,
}

impl Neighbor<'_> {
    /// Cosine similarity for results from a cosine index.
    #[inline]
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }
}

/// Exact nearest-neighbor index over fixed-dimension embeddings.
///
/// The index owns both the embedding matrix (dense, row-major) and the
/// parallel id-to-chunk map. It is built once in bulk and read-only
/// afterwards; queries take `&self`, so a shared index serves concurrent
/// lookups without locking. Lookups are a brute-force scan, which is exact
/// and entirely adequate at conversation-corpus scale.
pub struct VectorIndex {
    metric: Metric,
    dimension: usize,
    vectors: Vec<f32>,
    chunks: Vec<Chunk>,
}

impl VectorIndex {
    /// Build an index from parallel embedding and chunk sequences.
    ///
    /// Fails when the sequences differ in length or the embeddings differ in
    /// dimension. An empty input builds an empty index, which answers every
    /// query with no results; rejecting an empty corpus is the caller's
    /// startup-time decision.
    #[inline]
    pub fn build(
        embeddings: Vec<Vec<f32>>,
        chunks: Vec<Chunk>,
        metric: Metric,
    ) -> Result<VectorIndex> {
        if embeddings.len() != chunks.len() {
            return Err(TalkbackError::Index(format!(
                "Embedding count {} does not match chunk count {}",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dimension = embeddings.first().map_or(0, Vec::len);
        if !embeddings.is_empty() && dimension == 0 {
            return Err(TalkbackError::Index(
                "Embeddings must not be zero-dimensional".to_string(),
            ));
        }

        let mut vectors = Vec::with_capacity(embeddings.len() * dimension);
        for (row, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != dimension {
                return Err(TalkbackError::Index(format!(
                    "Inconsistent embedding dimension at row {}: expected {}, got {}",
                    row,
                    dimension,
                    embedding.len()
                )));
            }
            vectors.extend_from_slice(embedding);
        }

        debug!(
            "Built {:?} index: {} vectors, {} dimensions",
            metric,
            chunks.len(),
            dimension
        );

        Ok(VectorIndex {
            metric,
            dimension,
            vectors,
            chunks,
        })
    }

    /// Number of stored vectors.
    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding dimension enforced across the index; 0 for an empty index.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Find the `k` nearest stored chunks, ascending by distance.
    ///
    /// Ties are broken by insertion id, ascending, so results are fully
    /// deterministic. Returns `min(k, n)` results; `k == 0` and an empty
    /// index both yield an empty vector rather than an error.
    #[inline]
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor<'_>>> {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        if vector.len() != self.dimension {
            return Err(TalkbackError::Index(format!(
                "Query dimension {} does not match index dimension {}",
                vector.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(id, row)| (id, self.distance(vector, row)))
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(id, distance)| Neighbor {
                chunk: &self.chunks[id],
                distance,
            })
            .collect())
    }

    /// The single nearest stored chunk, if the index is non-empty.
    #[inline]
    pub fn nearest(&self, vector: &[f32]) -> Result<Option<Neighbor<'_>>> {
        Ok(self.query(vector, 1)?.into_iter().next())
    }

    fn distance(&self, query: &[f32], row: &[f32]) -> f32 {
        match self.metric {
            Metric::SquaredEuclidean => squared_euclidean(query, row),
            Metric::Cosine => 1.0 - cosine_similarity(query, row),
        }
    }
}

/// Squared Euclidean distance between two equal-length vectors.
#[inline]
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Cosine similarity between two equal-length vectors.
///
/// Zero-norm inputs have no direction and score 0.0 against everything.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
