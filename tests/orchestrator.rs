use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use rag_web::config::{AppConfig, GenerationConfig};
use rag_web::rag::chat::{ChatService, DisabledChat};
use rag_web::rag::embeddings::{EmbeddingService, HashedEmbeddings};
use rag_web::rag::memory_store::VolatileStore;
use rag_web::rag::semantic_memory::SemanticMemory;
use rag_web::rag::store::MemoryStore;
use rag_web::rag::{RAGEngine, SearchMode};
use rag_web::{RagError, Result};

const DIMS: usize = 64;

/// Records every prompt and answers with a fixed string.
#[derive(Default)]
struct RecordingChat {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ChatService for RecordingChat {
    async fn complete(&self, prompt: &str, settings: &GenerationConfig) -> Result<String> {
        assert_eq!(settings.max_tokens, 500);
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("Qdrant is a vector database.".to_string())
    }
}

struct FailingEmbeddings;

#[async_trait]
impl EmbeddingService for FailingEmbeddings {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::Embedding {
            provider: "test",
            message: "service unavailable".to_string(),
        })
    }
}

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.store.index.dimensions = DIMS;
    config
}

async fn populated_memory(config: &AppConfig) -> SemanticMemory {
    let collection = config.store.qualified_collection();
    let store = VolatileStore::new(DIMS, config.store.index.similarity);
    store.create_collection(&collection).await.unwrap();
    let memory = SemanticMemory::new(Arc::new(store), Arc::new(HashedEmbeddings::new(DIMS)));

    memory
        .save_information(
            &collection,
            "2",
            "Qdrant is an open-source vector database with an HNSW index",
            "Qdrant",
            Some(r#"{"id":"2","title":"Qdrant"}"#),
        )
        .await
        .unwrap();
    memory
        .save_information(&collection, "9", "Sourdough bread needs a starter", "Bread", None)
        .await
        .unwrap();
    memory
}

#[tokio::test]
async fn test_vector_mode_returns_best_match_text() {
    let config = config();
    let memory = populated_memory(&config).await;
    let engine = RAGEngine::new(memory, Arc::new(DisabledChat), &config);

    let answer = engine.answer("what is the qdrant vector database", SearchMode::Vector).await;
    assert_eq!(answer, "Qdrant is an open-source vector database with an HNSW index");
}

#[tokio::test]
async fn test_rag_mode_grounds_prompt_on_metadata() {
    let config = config();
    let memory = populated_memory(&config).await;
    let chat = Arc::new(RecordingChat::default());
    let engine = RAGEngine::new(memory, chat.clone(), &config);

    let answer = engine.answer("what is the qdrant vector database", SearchMode::Rag).await;
    assert_eq!(answer, "Qdrant is a vector database.");

    let prompts = chat.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(r#"provided context: {"id":"2","title":"Qdrant"}"#));
    assert!(prompts[0].contains("User: what is the qdrant vector database"));
}

#[tokio::test]
async fn test_rag_mode_uses_text_when_metadata_empty() {
    let config = config();
    let memory = populated_memory(&config).await;
    let chat = Arc::new(RecordingChat::default());
    let engine = RAGEngine::new(memory, chat.clone(), &config);

    engine.answer("sourdough bread starter", SearchMode::Rag).await;

    let prompts = chat.prompts.lock().unwrap();
    assert!(prompts[0].contains("provided context: Sourdough bread needs a starter"));
}

#[tokio::test]
async fn test_generation_failure_returns_placeholder() {
    let config = config();
    let memory = populated_memory(&config).await;
    let engine = RAGEngine::new(memory, Arc::new(DisabledChat), &config);

    let answer = engine.answer("qdrant", SearchMode::Rag).await;
    assert_eq!(answer, "The requested data is not Found.");
}

#[tokio::test]
async fn test_search_failure_yields_synthetic_result() {
    let config = config();
    let collection = config.store.qualified_collection();
    let store = VolatileStore::new(DIMS, config.store.index.similarity);
    store.create_collection(&collection).await.unwrap();
    let memory = SemanticMemory::new(Arc::new(store), Arc::new(FailingEmbeddings));
    let chat = Arc::new(RecordingChat::default());
    let engine = RAGEngine::new(memory, chat.clone(), &config);

    let results = engine.perform_vector_search("anything").await;
    assert_eq!(results.len(), 1);
    assert!(results[0].is_not_found());
    assert_eq!(results[0].text, "Not found!");

    assert_eq!(engine.answer("anything", SearchMode::Vector).await, "Not found!");
    assert_eq!(
        engine.answer("anything", SearchMode::Rag).await,
        "The requested data is not Found."
    );
    assert!(chat.prompts.lock().unwrap().is_empty());
}
