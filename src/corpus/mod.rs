#[cfg(test)]
mod tests;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

/// Marker opening a user turn in the transcript.
pub const USER_MARKER: &str = "User";
/// Marker opening an assistant turn in the transcript.
pub const AI_MARKER: &str = "AI";

/// One stored conversational turn pair from the transcript corpus.
///
/// Chunks are created once at load time and never mutated; their ids are the
/// insertion ordinals used by the vector index for deterministic tie-breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: usize,
    /// Literal two-line form: `"User: <query>\nAI: <response>"`.
    pub text: String,
}

impl Chunk {
    /// The reply portion following the `AI:` marker, trimmed.
    ///
    /// Returns `None` when the chunk carries no reply or an empty one, so
    /// callers can substitute a fallback phrase.
    #[inline]
    pub fn response(&self) -> Option<&str> {
        self.text
            .lines()
            .find_map(|line| line.strip_prefix("AI:"))
            .map(str::trim)
            .filter(|reply| !reply.is_empty())
    }

    /// The question portion following the `User:` marker, trimmed.
    #[inline]
    pub fn query(&self) -> Option<&str> {
        self.text
            .lines()
            .find_map(|line| line.strip_prefix("User:"))
            .map(str::trim)
            .filter(|query| !query.is_empty())
    }
}

/// Parse a flat transcript into (query, response) chunks.
///
/// A line beginning with the `User` marker opens a chunk; all immediately
/// following `AI` lines are space-joined as that chunk's response. Lines that
/// match neither marker close the current chunk and are skipped, as are `AI`
/// lines with no preceding `User` line. Empty input yields zero chunks.
#[inline]
pub fn parse_transcript<I, S>(lines: I) -> Vec<Chunk>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let lines: Vec<String> = lines
        .into_iter()
        .map(|line| line.as_ref().trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    let mut chunks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let Some(rest) = lines[i].strip_prefix(USER_MARKER) else {
            debug!("Skipping transcript line outside a turn pair: {}", lines[i]);
            i += 1;
            continue;
        };

        let query = rest.trim_start_matches(':').trim();

        let mut responses = Vec::new();
        let mut j = i + 1;
        while j < lines.len() {
            if let Some(reply) = lines[j].strip_prefix(AI_MARKER) {
                responses.push(reply.trim_start_matches(':').trim().to_string());
                j += 1;
            } else {
                break;
            }
        }

        chunks.push(Chunk {
            id: chunks.len(),
            text: format!("User: {}\nAI: {}", query, responses.join(" ")),
        });
        i = j;
    }

    chunks
}

/// Load the conversation corpus from a transcript file.
#[inline]
pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<Vec<Chunk>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;

    let chunks = parse_transcript(content.lines());
    info!(
        "Loaded {} conversation chunks from {}",
        chunks.len(),
        path.display()
    );
    Ok(chunks)
}
