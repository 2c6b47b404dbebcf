// Chat module
// Conversation history and the generation oracle that consumes augmented prompts

pub mod metrics;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Result;
use crate::embeddings::Embedder;
use crate::rag::RetrievalAugmenter;
use crate::vector_store::VectorStore;

pub use metrics::GenerationMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Text produced by a [`Generator`], with optional performance counters
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub metrics: Option<GenerationMetrics>,
}

/// Produces the assistant reply for an ordered list of turns
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<Generation>;
}

/// Strip surrounding whitespace, including the line terminator from stdin
#[inline]
pub fn normalize_input(input: &str) -> &str {
    input.trim()
}

/// Whether the user input should end an interactive chat
#[inline]
pub fn is_exit_command(input: &str) -> bool {
    let input = normalize_input(input);
    input.is_empty() || input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

/// Conversation state for an interactive chat.
///
/// The history only ever holds what the user actually typed. The retrieval
/// context is spliced into the outgoing request for the latest turn and is
/// never persisted.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    #[inline]
    pub fn new(system_prompt: Option<&str>) -> Self {
        let messages = system_prompt
            .map(str::trim)
            .filter(|prompt| !prompt.is_empty())
            .map(ChatMessage::system)
            .into_iter()
            .collect();

        Self { messages }
    }

    #[inline]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Send one user turn and record the exchange.
    ///
    /// The input is normalized before it is embedded or recorded. If
    /// augmentation or generation fails the history is left untouched.
    #[inline]
    pub async fn send(
        &mut self,
        input: &str,
        embedder: &dyn Embedder,
        store: &VectorStore,
        augmenter: &RetrievalAugmenter,
        generator: &dyn Generator,
    ) -> Result<Generation> {
        let input = normalize_input(input);
        let prompt = augmenter.augment(embedder, store, input).await?;
        debug!(
            "Sending turn {} ({} chars, augmented: {})",
            self.messages.len(),
            prompt.len(),
            prompt != input
        );

        let mut request = Vec::with_capacity(self.messages.len() + 1);
        request.extend_from_slice(&self.messages);
        request.push(ChatMessage::user(prompt));

        let generation = generator.generate(&request).await?;

        self.messages.push(ChatMessage::user(input));
        self.messages
            .push(ChatMessage::assistant(generation.text.clone()));

        Ok(generation)
    }
}
