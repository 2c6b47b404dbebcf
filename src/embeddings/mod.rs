// Embeddings module
// Paragraph chunking and the embedding oracle used for indexing and queries

pub mod chunking;
pub mod ollama;

use async_trait::async_trait;

use crate::Result;

pub use chunking::{ChunkingConfig, chunk_content, chunk_text};
pub use ollama::OllamaClient;

/// Maps text to a fixed-length embedding vector.
///
/// An implementation must return vectors of the same dimensionality for every
/// call. Failures are reported as [`crate::RagError::Embedding`].
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, returning vectors in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}
