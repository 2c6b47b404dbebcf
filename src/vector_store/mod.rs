// In-memory vector store
// Append-only chunk records ranked by cosine similarity with a linear scan


pub mod similarity;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{RagError, Result};

pub use similarity::cosine_similarity;

/// Metadata key holding the source document's relative path
pub const FILENAME_KEY: &str = "filename";

/// Arbitrary key/value metadata carried alongside a chunk.
///
/// The store never interprets it; search results hand it back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_filename(filename: impl Into<String>) -> Self {
        Self::new().with(FILENAME_KEY, filename.into())
    }

    #[inline]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    #[inline]
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The source identifier, if one was recorded as a string
    #[inline]
    pub fn filename(&self) -> Option<&str> {
        self.get(FILENAME_KEY).and_then(Value::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A chunk and its embedding, ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunk {
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
}

/// A ranked match returned by [`VectorStore::search`]
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub text: String,
    pub metadata: Metadata,
    pub score: f64,
}

/// In-memory store of embedded chunks.
///
/// Every record in one store shares the same embedding dimension. It is
/// fixed either explicitly with [`VectorStore::with_dimension`] or by the
/// first inserted record, and every later insert or query must match it.
#[derive(Debug, Clone, Default)]
pub struct VectorStore {
    records: Vec<EmbeddedChunk>,
    dimension: Option<usize>,
}

impl VectorStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that only accepts embeddings of length `dimension`
    #[inline]
    pub fn with_dimension(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::InvalidArgument(
                "embedding dimension must be positive".to_string(),
            ));
        }

        Ok(Self {
            records: Vec::new(),
            dimension: Some(dimension),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The embedding dimension, once known
    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Append a chunk record
    ///
    /// # Errors
    /// * `InvalidArgument` - empty text, or an empty or non-finite embedding
    /// * `DimensionMismatch` - embedding length differs from the store's dimension
    #[inline]
    pub fn add_document(
        &mut self,
        text: impl Into<String>,
        embedding: Vec<f32>,
        metadata: Metadata,
    ) -> Result<()> {
        self.add_documents(vec![EmbeddedChunk {
            text: text.into(),
            embedding,
            metadata,
        }])
    }

    /// Append several chunk records, all or nothing
    ///
    /// Every record is validated before any is stored, so a failure leaves
    /// the store unchanged.
    #[inline]
    pub fn add_documents(&mut self, chunks: Vec<EmbeddedChunk>) -> Result<()> {
        let mut dimension = self.dimension;
        for chunk in &chunks {
            if chunk.text.is_empty() {
                return Err(RagError::InvalidArgument(
                    "chunk text must not be empty".to_string(),
                ));
            }
            validate_vector(&chunk.embedding, "embedding")?;

            let expected = *dimension.get_or_insert(chunk.embedding.len());
            if expected != chunk.embedding.len() {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: chunk.embedding.len(),
                });
            }
        }

        if self.dimension.is_none() && dimension.is_some() {
            debug!("Vector store dimension set to {:?}", dimension);
        }
        self.dimension = dimension;
        self.records.extend(chunks);
        Ok(())
    }

    /// Rank stored chunks against a query embedding
    ///
    /// # Arguments
    /// * `query_embedding` - Non-empty, finite query vector
    /// * `min_score` - Inclusive lower bound on the cosine score, in `[0, 1]`
    /// * `max_results` - Maximum number of results, must be positive
    ///
    /// # Returns
    /// Results in descending score order. Equal scores keep insertion order.
    #[inline]
    pub fn search(
        &self,
        query_embedding: &[f32],
        min_score: f64,
        max_results: usize,
    ) -> Result<Vec<SearchResult>> {
        validate_vector(query_embedding, "query embedding")?;
        if !(0.0..=1.0).contains(&min_score) {
            return Err(RagError::InvalidArgument(format!(
                "min_score must be a number between 0 and 1, got {}",
                min_score
            )));
        }
        if max_results == 0 {
            return Err(RagError::InvalidArgument(
                "max_results must be a positive integer".to_string(),
            ));
        }
        match self.dimension {
            Some(expected) if expected != query_embedding.len() => {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: query_embedding.len(),
                });
            }
            _ => {}
        }

        let mut scored = Vec::new();
        for record in &self.records {
            let score = cosine_similarity(query_embedding, &record.embedding)?;
            if score >= min_score {
                scored.push((record, score));
            }
        }

        // sort_by is stable, so ties stay in insertion order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(max_results);

        debug!(
            "Search over {} records returned {} results (min score {}, max results {})",
            self.records.len(),
            scored.len(),
            min_score,
            max_results
        );

        Ok(scored
            .into_iter()
            .map(|(record, score)| SearchResult {
                text: record.text.clone(),
                metadata: record.metadata.clone(),
                score,
            })
            .collect())
    }
}

fn validate_vector(vector: &[f32], name: &str) -> Result<()> {
    if vector.is_empty() {
        return Err(RagError::InvalidArgument(format!(
            "{} must not be empty",
            name
        )));
    }

    if let Some(index) = vector.iter().position(|v| !v.is_finite()) {
        return Err(RagError::InvalidArgument(format!(
            "{} contains a non-finite value at index {}",
            name, index
        )));
    }

    Ok(())
}
