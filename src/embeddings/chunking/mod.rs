
use std::sync::LazyLock;

use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{RagError, Result};

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("valid regex"));

/// Configuration for content chunking
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Chunks whose trimmed length (in characters) is at or below this value are discarded
    pub min_length: usize,
}

/// Split document text into paragraph chunks.
///
/// The text is split on runs of two or more newlines, each piece is trimmed,
/// and pieces no longer than `min_length` characters are dropped. Chunks come
/// back in document order.
#[inline]
pub fn chunk_text(text: &str, min_length: usize) -> Result<Vec<String>> {
    let mut chunks = Vec::new();

    for piece in PARAGRAPH_BREAK.split(text) {
        let piece = piece.map_err(|e| RagError::Chunking(e.to_string()))?;
        let trimmed = piece.trim();
        if trimmed.chars().count() > min_length {
            chunks.push(trimmed.to_string());
        }
    }

    debug!(
        "Chunked {} chars into {} chunks (min length {})",
        text.len(),
        chunks.len(),
        min_length
    );

    Ok(chunks)
}

/// Chunk text using the settings from a [`ChunkingConfig`]
#[inline]
pub fn chunk_content(text: &str, config: &ChunkingConfig) -> Result<Vec<String>> {
    chunk_text(text, config.min_length)
}
