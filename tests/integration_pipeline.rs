#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end tests of ingestion and retrieval over real files

use async_trait::async_trait;
use docs_rag::Result;
use docs_rag::chat::{ChatMessage, ChatSession, Generation, Generator};
use docs_rag::content::{DirectorySource, ManifestSource, MemorySource, write_manifest};
use docs_rag::embeddings::Embedder;
use docs_rag::embeddings::chunking::ChunkingConfig;
use docs_rag::indexer::{FailurePolicy, Indexer};
use docs_rag::rag::{RetrievalAugmenter, SearchPolicy};
use docs_rag::vector_store::VectorStore;
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

/// Letter-frequency embedding, deterministic and dependency free
struct LetterEmbedder;

#[async_trait]
impl Embedder for LetterEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut counts = vec![0.0_f32; 26];
        for c in text.chars().filter(char::is_ascii_alphabetic) {
            let index = (c.to_ascii_lowercase() as u8 - b'a') as usize;
            counts[index] += 1.0;
        }
        Ok(counts)
    }
}

struct EchoGenerator {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<Generation> {
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.prompts.lock().expect("lock poisoned").push(last);
        Ok(Generation {
            text: "noted".to_string(),
            metrics: None,
        })
    }
}

const PARA_A: &str = "Para A with enough length to pass filtering.";
const PARA_B: &str = "Para B also long enough.";

#[tokio::test]
async fn two_paragraph_document_round_trip() {
    let source = MemorySource::new().with_document("doc.md", format!("{}\n\n{}", PARA_A, PARA_B));
    let mut store = VectorStore::new();

    let stats = Indexer::new(&LetterEmbedder)
        .with_chunking(ChunkingConfig { min_length: 0 })
        .ingest(&source, &mut store)
        .await
        .expect("ingestion should succeed");
    assert_eq!(stats.chunks_indexed, 2);
    assert_eq!(store.len(), 2);

    let query = LetterEmbedder.embed(PARA_A).await.expect("should embed");
    let results = store.search(&query, 0.3, 1).expect("search should succeed");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text, PARA_A);
    assert!((results[0].score - 1.0).abs() < 1e-6);
    assert_eq!(results[0].metadata.filename(), Some("doc.md"));
}

fn write_knowledge_base(root: &std::path::Path) {
    fs::create_dir_all(root.join("ops")).expect("should create dirs");
    fs::write(
        root.join("ops/probes.md"),
        "# Probes\n\nLiveness probes restart containers that stop responding.\n\nReadiness probes gate traffic.",
    )
    .expect("should write file");
    fs::write(
        root.join("database.md"),
        "# Vacuum\n\nVacuum reclaims storage occupied by dead tuples.",
    )
    .expect("should write file");
    fs::write(root.join("draft.txt"), "not part of the knowledge base").expect("should write file");
}

#[tokio::test]
async fn directory_and_manifest_sources_index_identically() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    write_knowledge_base(temp_dir.path());

    let directory = DirectorySource::new(temp_dir.path(), "md");
    let manifest_path = temp_dir.path().join("content.json");
    write_manifest(&directory, &manifest_path)
        .await
        .expect("should write manifest");
    let manifest = ManifestSource::new(temp_dir.path(), &manifest_path);

    let indexer = Indexer::new(&LetterEmbedder).with_chunking(ChunkingConfig { min_length: 10 });

    let mut from_directory = VectorStore::new();
    let directory_stats = indexer
        .ingest(&directory, &mut from_directory)
        .await
        .expect("directory ingestion should succeed");

    let mut from_manifest = VectorStore::new();
    let manifest_stats = indexer
        .ingest(&manifest, &mut from_manifest)
        .await
        .expect("manifest ingestion should succeed");

    assert_eq!(directory_stats, manifest_stats);
    assert_eq!(directory_stats.documents_processed, 2);
    // headings are too short to pass the minimum length
    assert_eq!(directory_stats.chunks_indexed, 3);

    let query = LetterEmbedder
        .embed("Vacuum reclaims storage occupied by dead tuples.")
        .await
        .expect("should embed");
    let a = from_directory.search(&query, 0.3, 3).expect("search should succeed");
    let b = from_manifest.search(&query, 0.3, 3).expect("search should succeed");
    assert_eq!(a, b);
    assert_eq!(a[0].metadata.filename(), Some("database.md"));
}

#[tokio::test]
async fn missing_content_directory_yields_empty_index() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let source = DirectorySource::new(temp_dir.path().join("content"), "md");
    let mut store = VectorStore::new();

    let stats = Indexer::new(&LetterEmbedder)
        .ingest(&source, &mut store)
        .await
        .expect("missing content should not fail ingestion");

    assert_eq!(stats.documents_processed, 0);
    assert!(store.is_empty());

    let prompt = RetrievalAugmenter::default()
        .augment(&LetterEmbedder, &store, "anything at all")
        .await
        .expect("should augment");
    assert_eq!(prompt, "anything at all");
}

#[tokio::test]
async fn unreadable_document_is_skipped_when_configured() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    write_knowledge_base(temp_dir.path());
    let manifest_path = temp_dir.path().join("content.json");
    fs::write(&manifest_path, r#"["database.md", "missing.md", "ops/probes.md"]"#)
        .expect("should write manifest");
    let source = ManifestSource::new(temp_dir.path(), &manifest_path);

    let mut store = VectorStore::new();
    let result = Indexer::new(&LetterEmbedder).ingest(&source, &mut store).await;
    assert!(result.is_err());

    let mut store = VectorStore::new();
    let stats = Indexer::new(&LetterEmbedder)
        .with_failure_policy(FailurePolicy::SkipDocument)
        .ingest(&source, &mut store)
        .await
        .expect("skip policy should not fail the run");
    assert_eq!(stats.documents_processed, 2);
    assert_eq!(stats.documents_failed, 1);
}

#[tokio::test]
async fn chat_sends_context_but_remembers_the_question() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    write_knowledge_base(temp_dir.path());

    let mut store = VectorStore::new();
    Indexer::new(&LetterEmbedder)
        .with_chunking(ChunkingConfig { min_length: 10 })
        .ingest(&DirectorySource::new(temp_dir.path(), "md"), &mut store)
        .await
        .expect("ingestion should succeed");

    let augmenter = RetrievalAugmenter::new(SearchPolicy {
        min_score: 0.8,
        max_results: 1,
    });
    let generator = EchoGenerator {
        prompts: Mutex::new(Vec::new()),
    };
    let mut session = ChatSession::new(Some("You are helpful."));
    let question = "Vacuum reclaims storage occupied by dead tuples?";

    session
        .send(question, &LetterEmbedder, &store, &augmenter, &generator)
        .await
        .expect("should generate");

    let prompts = generator.prompts.lock().expect("lock poisoned");
    assert!(prompts[0].starts_with("### Context from Knowledge Base:\n[Source: database.md]\n"));
    assert!(prompts[0].contains(question));
    drop(prompts);

    assert_eq!(session.messages()[1], ChatMessage::user(question));
    assert_eq!(session.messages()[2], ChatMessage::assistant("noted"));
}
