// Embeddings module
// Encoder contract plus the Ollama-compatible HTTP client implementing it

pub mod ollama;

pub use ollama::OllamaClient;

use crate::Result;

/// Text-to-vector encoder.
///
/// Implementations must be deterministic for a fixed model and input, hold no
/// mutable state across calls, and be safe to share across threads for
/// concurrent read-only inference. Batched and single-item calls must agree
/// numerically for identical text.
///
/// Two encoder roles exist in the system: a primary encoder for the main
/// conversation corpus and a (possibly cheaper) encoder for the guardrail
/// exemplar set. Both conform to this one contract.
pub trait Embedder: Send + Sync {
    /// Encode one text into a fixed-dimension dense vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Encode several texts, one vector per input, in input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}
