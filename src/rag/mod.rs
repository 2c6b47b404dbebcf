// Retrieval augmentation
// Turns a user query into a prompt grounded in the most relevant stored chunks


use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Result;
use crate::embeddings::Embedder;
use crate::vector_store::{SearchResult, VectorStore};

const DEFAULT_MIN_SCORE: f64 = 0.3;
const DEFAULT_MAX_RESULTS: usize = 3;

const UNKNOWN_SOURCE: &str = "unknown";
const CONTEXT_HEADER: &str = "### Context from Knowledge Base:";
const QUESTION_HEADER: &str = "### User Question:";
const ANSWER_INSTRUCTION: &str = "Please answer the user's question accurately using only the provided context above. If the context doesn't contain the answer, say you don't know.";

/// Retrieval thresholds applied to every query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchPolicy {
    /// Inclusive lower bound on the cosine score
    pub min_score: f64,
    pub max_results: usize,
}

impl Default for SearchPolicy {
    #[inline]
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// Builds augmented prompts from a vector store
#[derive(Debug, Clone, Default)]
pub struct RetrievalAugmenter {
    policy: SearchPolicy,
}

impl RetrievalAugmenter {
    #[inline]
    pub fn new(policy: SearchPolicy) -> Self {
        Self { policy }
    }

    /// Embed `query` and rank stored chunks against it
    #[inline]
    pub async fn retrieve(
        &self,
        embedder: &dyn Embedder,
        store: &VectorStore,
        query: &str,
    ) -> Result<Vec<SearchResult>> {
        let query_embedding = embedder.embed(query).await?;
        store.search(
            &query_embedding,
            self.policy.min_score,
            self.policy.max_results,
        )
    }

    /// The context block for `query`, or `None` when nothing passes the threshold
    #[inline]
    pub async fn relevant_context(
        &self,
        embedder: &dyn Embedder,
        store: &VectorStore,
        query: &str,
    ) -> Result<Option<String>> {
        let results = self.retrieve(embedder, store, query).await?;
        if results.is_empty() {
            debug!("No relevant context found for query");
            return Ok(None);
        }

        info!(
            "Found {} relevant chunks (scores: {})",
            results.len(),
            results.iter().map(|r| format!("{:.3}", r.score)).join(", ")
        );
        Ok(Some(format_context(&results)))
    }

    /// Wrap `query` with retrieved context and answering instructions
    ///
    /// When no chunk passes the threshold the query is returned unchanged.
    #[inline]
    pub async fn augment(
        &self,
        embedder: &dyn Embedder,
        store: &VectorStore,
        query: &str,
    ) -> Result<String> {
        Ok(match self.relevant_context(embedder, store, query).await? {
            Some(context) => augmented_prompt(&context, query),
            None => query.to_string(),
        })
    }
}

/// Render results as `[Source: <filename>]` blocks separated by blank lines
#[inline]
pub fn format_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|result| {
            format!(
                "[Source: {}]\n{}",
                result.metadata.filename().unwrap_or(UNKNOWN_SOURCE),
                result.text
            )
        })
        .join("\n\n")
}

/// The prompt sent to the generator when context was found
#[inline]
pub fn augmented_prompt(context: &str, query: &str) -> String {
    [
        CONTEXT_HEADER,
        context,
        QUESTION_HEADER,
        query,
        ANSWER_INSTRUCTION,
    ]
    .join("\n")
}
