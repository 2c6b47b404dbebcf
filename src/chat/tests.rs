use super::*;
use crate::RagError;
use crate::rag::SearchPolicy;
use crate::vector_store::Metadata;
use std::sync::Mutex;

/// Every text containing "probe" maps to the same direction
struct ProbeEmbedder;

#[async_trait]
impl Embedder for ProbeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.to_lowercase().contains("probe") {
            Ok(vec![1.0, 0.0])
        } else {
            Ok(vec![0.0, 1.0])
        }
    }
}

/// Records each request and answers with a numbered reply
#[derive(Default)]
struct RecordingGenerator {
    requests: Mutex<Vec<Vec<ChatMessage>>>,
    fail: bool,
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<Generation> {
        if self.fail {
            return Err(RagError::Generation("model crashed".to_string()));
        }

        let mut requests = self.requests.lock().expect("lock poisoned");
        requests.push(messages.to_vec());
        Ok(Generation {
            text: format!("reply {}", requests.len()),
            metrics: None,
        })
    }
}

fn knowledge_base() -> VectorStore {
    let mut store = VectorStore::new();
    store
        .add_document(
            "Liveness probes restart stuck containers.",
            vec![1.0, 0.0],
            Metadata::with_filename("probes.md"),
        )
        .expect("should add document");
    store
}

fn augmenter() -> RetrievalAugmenter {
    RetrievalAugmenter::new(SearchPolicy {
        min_score: 0.5,
        max_results: 3,
    })
}

#[test]
fn exit_commands() {
    assert!(is_exit_command(""));
    assert!(is_exit_command("   "));
    assert!(is_exit_command("exit"));
    assert!(is_exit_command("QUIT"));
    assert!(is_exit_command("  Exit \n"));
    assert!(!is_exit_command("exit now"));
    assert!(!is_exit_command("what is a probe?"));
}

#[test]
fn input_is_normalized() {
    assert_eq!(normalize_input("How do liveness probes work?\n"), "How do liveness probes work?");
    assert_eq!(normalize_input("  exit\r\n"), "exit");
    assert_eq!(normalize_input("\n"), "");
    assert_eq!(normalize_input("already clean"), "already clean");
}

#[test]
fn system_prompt_starts_the_history() {
    let session = ChatSession::new(Some("You are an SRE assistant."));
    assert_eq!(
        session.messages(),
        &[ChatMessage::system("You are an SRE assistant.")]
    );

    assert!(ChatSession::new(None).messages().is_empty());
    assert!(ChatSession::new(Some("  \n")).messages().is_empty());
}

#[test]
fn roles_serialize_lowercase() {
    let json = serde_json::to_value(ChatMessage::assistant("hi")).expect("should serialize");
    assert_eq!(json, serde_json::json!({ "role": "assistant", "content": "hi" }));
}

#[tokio::test]
async fn history_keeps_the_original_question() {
    let store = knowledge_base();
    let generator = RecordingGenerator::default();
    let mut session = ChatSession::new(Some("system"));

    let generation = session
        .send(
            "How do liveness probes work?",
            &ProbeEmbedder,
            &store,
            &augmenter(),
            &generator,
        )
        .await
        .expect("should generate");
    assert_eq!(generation.text, "reply 1");

    let requests = generator.requests.lock().expect("lock poisoned");
    let sent = &requests[0];
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], ChatMessage::system("system"));
    assert_eq!(sent[1].role, Role::User);
    assert!(sent[1].content.starts_with("### Context from Knowledge Base:\n[Source: probes.md]"));
    assert!(sent[1].content.contains("How do liveness probes work?"));
    drop(requests);

    assert_eq!(
        session.messages(),
        &[
            ChatMessage::system("system"),
            ChatMessage::user("How do liveness probes work?"),
            ChatMessage::assistant("reply 1"),
        ]
    );
}

#[tokio::test]
async fn later_turns_include_previous_exchanges() {
    let store = knowledge_base();
    let generator = RecordingGenerator::default();
    let mut session = ChatSession::new(None);

    session
        .send("Tell me about probes", &ProbeEmbedder, &store, &augmenter(), &generator)
        .await
        .expect("should generate");
    session
        .send("And the weather?", &ProbeEmbedder, &store, &augmenter(), &generator)
        .await
        .expect("should generate");

    let requests = generator.requests.lock().expect("lock poisoned");
    let second = &requests[1];
    assert_eq!(second.len(), 3);
    assert_eq!(second[0], ChatMessage::user("Tell me about probes"));
    assert_eq!(second[1], ChatMessage::assistant("reply 1"));
    // no match, so the question goes out as typed
    assert_eq!(second[2], ChatMessage::user("And the weather?"));
    drop(requests);

    assert_eq!(session.messages().len(), 4);
}

#[tokio::test]
async fn failed_generation_leaves_history_unchanged() {
    let store = knowledge_base();
    let generator = RecordingGenerator {
        fail: true,
        ..RecordingGenerator::default()
    };
    let mut session = ChatSession::new(Some("system"));

    let result = session
        .send("What is a probe?", &ProbeEmbedder, &store, &augmenter(), &generator)
        .await;

    assert!(matches!(result, Err(RagError::Generation(_))));
    assert_eq!(session.messages(), &[ChatMessage::system("system")]);
}

#[tokio::test]
async fn stdin_line_terminator_is_not_sent_or_recorded() {
    let store = knowledge_base();
    let generator = RecordingGenerator::default();
    let mut session = ChatSession::new(None);

    session
        .send(
            "How do liveness probes work?\n",
            &ProbeEmbedder,
            &store,
            &augmenter(),
            &generator,
        )
        .await
        .expect("should generate");

    let requests = generator.requests.lock().expect("lock poisoned");
    let prompt = &requests[0][0].content;
    assert!(prompt.contains("### User Question:\nHow do liveness probes work?\nPlease answer"));
    drop(requests);

    assert_eq!(
        session.messages()[0],
        ChatMessage::user("How do liveness probes work?")
    );
}
