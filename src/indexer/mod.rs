// Indexer module
// Reads documents from a content source, chunks and embeds them, and fills the vector store


use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::content::ContentSource;
use crate::embeddings::Embedder;
use crate::embeddings::chunking::{ChunkingConfig, chunk_content};
use crate::vector_store::{EmbeddedChunk, Metadata, VectorStore};
use crate::{RagError, Result};

/// Metadata key holding a chunk's position within its document
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// What to do when a single document cannot be indexed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the whole run and return the error
    #[default]
    Abort,
    /// Log the error, leave the document out of the store, and continue
    SkipDocument,
}

/// Ingestion settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub on_document_error: FailurePolicy,
}

/// Statistics about an ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexingStats {
    pub documents_processed: usize,
    pub documents_failed: usize,
    pub chunks_indexed: usize,
}

/// Progress notifications emitted while ingesting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionEvent<'a> {
    Started { total_documents: usize },
    Indexed { relative_path: &'a str, chunks: usize },
    Skipped { relative_path: &'a str },
}

/// Sequential ingestion pipeline.
///
/// Documents are processed one at a time in path order, and the chunks of a
/// document are embedded in order, so store insertion order is deterministic.
pub struct Indexer<'a> {
    embedder: &'a dyn Embedder,
    chunking_config: ChunkingConfig,
    failure_policy: FailurePolicy,
}

impl<'a> Indexer<'a> {
    #[inline]
    pub fn new(embedder: &'a dyn Embedder) -> Self {
        Self {
            embedder,
            chunking_config: ChunkingConfig::default(),
            failure_policy: FailurePolicy::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_chunking(mut self, config: ChunkingConfig) -> Self {
        self.chunking_config = config;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Index every document in `source` into `store`
    #[inline]
    pub async fn ingest(
        &self,
        source: &dyn ContentSource,
        store: &mut VectorStore,
    ) -> Result<IndexingStats> {
        self.ingest_with_progress(source, store, |_| {}).await
    }

    /// Index every document in `source`, reporting progress through `on_event`
    ///
    /// A missing content source is not an error: the run logs a warning and
    /// indexes nothing. Any other listing failure is returned. Failures on a
    /// single document follow the configured [`FailurePolicy`].
    #[inline]
    pub async fn ingest_with_progress<F>(
        &self,
        source: &dyn ContentSource,
        store: &mut VectorStore,
        mut on_event: F,
    ) -> Result<IndexingStats>
    where
        F: FnMut(IngestionEvent<'_>) + Send,
    {
        let start = Instant::now();
        let mut stats = IndexingStats::default();

        let documents = match source.list().await {
            Ok(documents) => documents,
            Err(RagError::ContentSourceNotFound(path)) => {
                warn!(
                    "Content source {} not found, no documents ingested",
                    path.display()
                );
                on_event(IngestionEvent::Started { total_documents: 0 });
                return Ok(stats);
            }
            Err(e) => return Err(e),
        };

        info!(
            "Ingesting {} files from \"{}\"",
            documents.len(),
            source.location()
        );
        on_event(IngestionEvent::Started {
            total_documents: documents.len(),
        });

        for relative_path in &documents {
            match self.ingest_document(source, relative_path, store).await {
                Ok(chunks) => {
                    debug!("Processed file: {} - {} chunks", relative_path, chunks);
                    stats.documents_processed += 1;
                    stats.chunks_indexed += chunks;
                    on_event(IngestionEvent::Indexed {
                        relative_path,
                        chunks,
                    });
                }
                Err(e) => match self.failure_policy {
                    FailurePolicy::Abort => {
                        error!("Failed to ingest {}: {}", relative_path, e);
                        return Err(e);
                    }
                    FailurePolicy::SkipDocument => {
                        error!("Skipping {}: {}", relative_path, e);
                        stats.documents_failed += 1;
                        on_event(IngestionEvent::Skipped { relative_path });
                    }
                },
            }
        }

        info!(
            "Indexed {} chunks from {} files ({} skipped) in {:.2?}",
            stats.chunks_indexed,
            stats.documents_processed,
            stats.documents_failed,
            start.elapsed()
        );

        Ok(stats)
    }

    async fn ingest_document(
        &self,
        source: &dyn ContentSource,
        relative_path: &str,
        store: &mut VectorStore,
    ) -> Result<usize> {
        let text = source.read(relative_path).await?;
        self.index_document(relative_path, &text, store).await
    }

    /// Chunk, embed and store a single document
    ///
    /// # Returns
    /// * `Result<usize>` - Number of chunks stored
    #[inline]
    pub async fn index_document(
        &self,
        relative_path: &str,
        text: &str,
        store: &mut VectorStore,
    ) -> Result<usize> {
        let chunks = chunk_content(text, &self.chunking_config)?;
        if chunks.is_empty() {
            debug!("No chunks generated for {}", relative_path);
            return Ok(0);
        }

        let embeddings = self.embedder.embed_batch(&chunks).await?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::Embedding(format!(
                "Embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let count = chunks.len();
        let records = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(chunk_index, (text, embedding))| EmbeddedChunk {
                text,
                embedding,
                metadata: Metadata::with_filename(relative_path).with(CHUNK_INDEX_KEY, chunk_index),
            })
            .collect();

        store.add_documents(records)?;
        Ok(count)
    }
}
