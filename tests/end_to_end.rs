#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

use std::fs;
use std::sync::{Arc, Mutex};

use faq_chat::chat::{Assistant, ChatSession, PipelineStep, Role, TurnObserver, TurnStage};
use faq_chat::commands::ingest_faq;
use faq_chat::config::{
    Config, Credentials, EmbeddingConfig, IndexConfig, IndexProvider, IngestionConfig, Metric,
};
use faq_chat::embeddings::OpenAiEmbedder;
use faq_chat::generation::Generator;
use faq_chat::index::{IndexCatalog, IndexSpec, LanceCatalog};
use faq_chat::{FaqError, Result};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SHIPPING_QUESTION: &str = "How can I track my order?";
const SHIPPING_ANSWER: &str = "Use the tracking link in your confirmation email.";
const RETURNS_QUESTION: &str = "What is your return policy?";
const RETURNS_ANSWER: &str = "Items can be returned within 30 days.";

/// Serve a fixed embedding for one exact input text
async fn mount_embedding(server: &MockServer, text: &str, embedding: [f32; 3]) {
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(body_partial_json(json!({ "input": [text] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": embedding}],
            "model": "text-embedding-3-small"
        })))
        .mount(server)
        .await;
}

async fn setup() -> (MockServer, TempDir, Config, Credentials) {
    let server = MockServer::start().await;
    mount_embedding(&server, SHIPPING_QUESTION, [1.0, 0.0, 0.0]).await;
    mount_embedding(&server, RETURNS_QUESTION, [0.0, 1.0, 0.0]).await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let dataset_path = temp_dir.path().join("faq.csv");
    fs::write(
        &dataset_path,
        format!(
            "Question,Answer\n{},{}\n{},{}\n",
            SHIPPING_QUESTION, SHIPPING_ANSWER, RETURNS_QUESTION, RETURNS_ANSWER
        ),
    )
    .expect("should write dataset");

    let config = Config {
        embedding: EmbeddingConfig {
            base_url: server.uri(),
            dimension: 3,
            ..EmbeddingConfig::default()
        },
        index: IndexConfig {
            provider: IndexProvider::LanceDb,
            ..IndexConfig::default()
        },
        ingestion: IngestionConfig { dataset_path },
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };

    let credentials = Credentials {
        openai_api_key: "sk-test".to_string(),
        pinecone_api_key: None,
        google_api_key: "google-test".to_string(),
    };

    (server, temp_dir, config, credentials)
}

/// Generator that answers with a fixed reply and keeps the prompts
#[derive(Default)]
struct CapturingGenerator {
    prompts: Mutex<Vec<String>>,
}

impl Generator for CapturingGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .map_err(|e| FaqError::Generation(e.to_string()))?
            .push(prompt.to_string());
        Ok("You can track it from the confirmation email.".to_string())
    }
}

#[derive(Default)]
struct RecordingObserver {
    stages: Vec<TurnStage>,
    degraded: Vec<PipelineStep>,
}

impl TurnObserver for RecordingObserver {
    fn stage_changed(&mut self, stage: TurnStage) {
        self.stages.push(stage);
    }

    fn degraded(&mut self, step: PipelineStep, _error: &FaqError) {
        self.degraded.push(step);
    }
}

#[tokio::test]
async fn ingested_rows_are_retrievable() {
    let (_server, _temp_dir, config, credentials) = setup().await;

    let written = ingest_faq(&config, &credentials)
        .await
        .expect("ingestion should succeed");
    assert_eq!(written, 2);

    let catalog = LanceCatalog::open(config.vector_database_path(), Metric::Cosine)
        .await
        .expect("should open store");
    assert_eq!(
        catalog.list_indexes().await.expect("should list indexes"),
        vec!["ukmegashop-faq".to_string()]
    );

    let index = catalog
        .open_index("ukmegashop-faq")
        .await
        .expect("should open index");
    let matches = index
        .query(&[0.9, 0.1, 0.0], 2)
        .await
        .expect("query should succeed");

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].id, "qa_0");
    assert_eq!(matches[0].metadata.question, SHIPPING_QUESTION);
    assert_eq!(matches[0].metadata.answer, SHIPPING_ANSWER);
    assert_eq!(matches[1].id, "qa_1");
}

#[tokio::test]
async fn reingesting_overwrites_by_id() {
    let (_server, _temp_dir, config, credentials) = setup().await;

    ingest_faq(&config, &credentials)
        .await
        .expect("first ingestion should succeed");
    let written = ingest_faq(&config, &credentials)
        .await
        .expect("second ingestion should succeed");
    assert_eq!(written, 2);

    let catalog = LanceCatalog::open(config.vector_database_path(), Metric::Cosine)
        .await
        .expect("should open store");
    let index = catalog
        .open_index("ukmegashop-faq")
        .await
        .expect("should open index");
    let matches = index
        .query(&[0.0, 1.0, 0.0], 10)
        .await
        .expect("query should succeed");

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].id, "qa_1");
}

#[tokio::test]
async fn missing_dataset_aborts_ingestion() {
    let (_server, temp_dir, mut config, credentials) = setup().await;
    config.ingestion.dataset_path = temp_dir.path().join("absent.csv");

    let error = ingest_faq(&config, &credentials)
        .await
        .expect_err("dataset does not exist");

    assert!(matches!(error, FaqError::Dataset(_)));
    assert!(error.to_string().contains("CSV file not found at:"));
    assert!(!config.vector_database_path().join("ukmegashop-faq.lance").exists());
}

#[tokio::test]
async fn chat_turn_answers_from_ingested_context() {
    let (server, _temp_dir, config, credentials) = setup().await;
    mount_embedding(&server, "Where is my parcel?", [0.95, 0.05, 0.0]).await;

    ingest_faq(&config, &credentials)
        .await
        .expect("ingestion should succeed");

    let catalog = LanceCatalog::open(config.vector_database_path(), config.index.metric)
        .await
        .expect("should open store");
    let index = catalog
        .open_index(&config.index.name)
        .await
        .expect("should open index");
    let embedder = OpenAiEmbedder::new(&config.embedding, credentials.openai_api_key.clone())
        .expect("should create embedder");
    let generator = Arc::new(CapturingGenerator::default());

    let assistant = Assistant::new(
        Arc::new(embedder),
        index,
        generator.clone(),
        config.generation.persona.clone(),
        1,
    );
    let mut session = ChatSession::new();
    let mut observer = RecordingObserver::default();

    let outcome = assistant
        .process_turn(&mut session, "Where is my parcel?", &mut observer)
        .await;

    assert!(observer.degraded.is_empty());
    assert_eq!(observer.stages.last(), Some(&TurnStage::Rendered));
    assert_eq!(outcome.context.len(), 1);
    assert_eq!(outcome.context[0].metadata.answer, SHIPPING_ANSWER);

    let prompts = generator
        .prompts
        .lock()
        .expect("lock should not be poisoned")
        .clone();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with(&config.generation.persona));
    assert!(prompts[0].contains("User query: Where is my parcel?"));
    assert!(prompts[0].contains(SHIPPING_ANSWER));
    assert!(!prompts[0].contains(RETURNS_ANSWER));

    assert_eq!(session.len(), 4);
    assert_eq!(session.turns()[3].role, Role::Assistant);
    assert_eq!(
        session.turns()[3].content,
        "You can track it from the confirmation email."
    );
}

#[tokio::test]
async fn existing_index_of_another_dimension_stops_ingestion_before_embedding() {
    let (server, _temp_dir, config, credentials) = setup().await;

    let catalog = LanceCatalog::open(config.vector_database_path(), Metric::Cosine)
        .await
        .expect("should open store");
    catalog
        .create_index(&IndexSpec {
            name: config.index.name.clone(),
            dimension: 4,
            metric: Metric::Cosine,
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
        })
        .await
        .expect("should create index");

    let error = ingest_faq(&config, &credentials)
        .await
        .expect_err("3-dimensional embeddings do not fit a 4-dimensional index");

    assert!(matches!(error, FaqError::Index(_)));
    assert!(error.to_string().contains("dimension"));
    let requests = server
        .received_requests()
        .await
        .expect("request recording is enabled");
    assert!(requests.is_empty());
}
