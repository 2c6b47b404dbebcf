#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Full pipeline against a mock Ollama server

use docs_rag::chat::ChatSession;
use docs_rag::config::{Config, OllamaConfig};
use docs_rag::content::MemorySource;
use docs_rag::embeddings::OllamaClient;
use docs_rag::embeddings::chunking::ChunkingConfig;
use docs_rag::indexer::Indexer;
use docs_rag::rag::RetrievalAugmenter;
use docs_rag::vector_store::VectorStore;
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const TOPICS: [&str; 3] = ["probe", "vacuum", "terraform"];

/// Answers `/api/embed` with topic-count vectors for each input
struct TopicEmbeddings;

impl Respond for TopicEmbeddings {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Ok(body) = serde_json::from_slice::<Value>(&request.body) else {
            return ResponseTemplate::new(400);
        };
        let inputs = body["input"].as_array().cloned().unwrap_or_default();

        let embeddings: Vec<Vec<f32>> = inputs
            .iter()
            .map(|input| {
                let text = input.as_str().unwrap_or_default().to_lowercase();
                TOPICS
                    .iter()
                    .map(|topic| text.matches(topic).count() as f32 + 0.01)
                    .collect()
            })
            .collect();

        ResponseTemplate::new(200).set_body_json(json!({
            "model": "all-minilm:latest",
            "embeddings": embeddings
        }))
    }
}

async fn mock_ollama() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(TopicEmbeddings)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2:latest",
            "message": { "role": "assistant", "content": "Restart the pod." },
            "done": true,
            "total_duration": 1_000_000_000_u64,
            "load_duration": 50_000_000_u64,
            "prompt_eval_count": 40,
            "prompt_eval_duration": 200_000_000_u64,
            "eval_count": 5
        })))
        .mount(&server)
        .await;

    server
}

fn client_for(server: &MockServer) -> OllamaClient {
    let address = server.address();
    let config = Config {
        ollama: OllamaConfig {
            host: address.ip().to_string(),
            port: address.port(),
            batch_size: 2,
            ..OllamaConfig::default()
        },
        ..Config::default()
    };

    OllamaClient::new(&config)
        .expect("Failed to create client")
        .with_retry_delay(Duration::from_millis(1))
}

fn knowledge_base() -> MemorySource {
    MemorySource::new()
        .with_document(
            "k8s.md",
            "A failing liveness probe restarts the container.\n\nEvery probe has a timeout.\n\nProbe periods are configurable.",
        )
        .with_document("postgres.md", "Vacuum reclaims dead tuples.")
        .with_document("iac.md", "Terraform plans before it applies.")
}

#[tokio::test]
async fn ingest_and_chat_through_ollama() {
    let server = mock_ollama().await;
    let client = client_for(&server);

    let mut store = VectorStore::new();
    let stats = Indexer::new(&client)
        .with_chunking(ChunkingConfig { min_length: 10 })
        .ingest(&knowledge_base(), &mut store)
        .await
        .expect("ingestion should succeed");

    assert_eq!(stats.documents_processed, 3);
    assert_eq!(stats.chunks_indexed, 5);
    assert_eq!(store.dimension(), Some(3));

    let augmenter = RetrievalAugmenter::default();
    let mut session = ChatSession::new(Some("You are an SRE assistant."));
    let generation = session
        .send(
            "Why did my probe restart the pod?",
            &client,
            &store,
            &augmenter,
            &client,
        )
        .await
        .expect("chat should succeed");

    assert_eq!(generation.text, "Restart the pod.");
    let metrics = generation.metrics.expect("metrics should be reported");
    assert_eq!(metrics.generated_tokens, 5);

    // the chat request carried retrieved context from the probe document
    let requests = server
        .received_requests()
        .await
        .expect("request recording is enabled");
    let chat_request = requests
        .iter()
        .find(|r| r.url.path() == "/api/chat")
        .expect("chat request was sent");
    let body: Value = serde_json::from_slice(&chat_request.body).expect("valid json body");
    let prompt = body["messages"][1]["content"]
        .as_str()
        .expect("user message content");
    assert!(prompt.contains("[Source: k8s.md]"));
    assert!(!prompt.contains("postgres.md"));

    assert_eq!(session.messages().len(), 3);
    assert_eq!(
        session.messages()[1].content,
        "Why did my probe restart the pod?"
    );
}

#[tokio::test]
async fn embedding_batches_follow_batch_size() {
    let server = mock_ollama().await;
    let client = client_for(&server);

    let mut store = VectorStore::new();
    Indexer::new(&client)
        .with_chunking(ChunkingConfig { min_length: 10 })
        .ingest(&knowledge_base(), &mut store)
        .await
        .expect("ingestion should succeed");

    let requests = server
        .received_requests()
        .await
        .expect("request recording is enabled");
    let embed_inputs: Vec<usize> = requests
        .iter()
        .filter(|r| r.url.path() == "/api/embed")
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).expect("valid json body");
            body["input"].as_array().map_or(0, Vec::len)
        })
        .collect();

    // iac.md, k8s.md (3 chunks split 2 + 1), postgres.md
    assert_eq!(embed_inputs, vec![1, 2, 1, 1]);
}
