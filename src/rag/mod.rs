pub mod chat;
pub mod embeddings;
pub mod memory_store;
pub mod prompt;
pub mod semantic_memory;
pub mod store;
pub mod vector_store;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::{AppConfig, EmbeddingBackend, GenerationConfig};
use crate::error::{RagError, Result};
use crate::models::{SearchResult, NOT_FOUND_ANSWER, NOT_FOUND_TEXT};
use self::chat::{AzureOpenAIChat, ChatService, DisabledChat};
use self::embeddings::{AzureOpenAIEmbeddings, EmbeddingService, HashedEmbeddings};
use self::prompt::{PromptTemplate, DB_RECORD, QUERY_TERM};
use self::semantic_memory::SemanticMemory;
use self::store::StoreBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Vector search, then a grounded chat completion
    Rag,
    /// Vector search only
    Vector,
}

impl FromStr for SearchMode {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rag" => Ok(SearchMode::Rag),
            "vector" => Ok(SearchMode::Vector),
            other => Err(RagError::InvalidOption(other.to_string())),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Rag => f.write_str("rag"),
            SearchMode::Vector => f.write_str("vector"),
        }
    }
}

/// Answers queries against one collection, optionally grounding a chat completion
/// on the best match. Built once at startup and shared across requests.
pub struct RAGEngine {
    memory: SemanticMemory,
    chat: Arc<dyn ChatService>,
    prompt: PromptTemplate,
    settings: GenerationConfig,
    collection: String,
    search_limit: usize,
    min_relevance: f32,
}

impl RAGEngine {
    pub fn new(memory: SemanticMemory, chat: Arc<dyn ChatService>, config: &AppConfig) -> Self {
        Self {
            memory,
            chat,
            prompt: PromptTemplate::grounded_response(),
            settings: config.generation.clone(),
            collection: config.store.qualified_collection(),
            search_limit: config.store.search_limit.max(1),
            min_relevance: config.store.min_relevance,
        }
    }

    /// Builds the model clients and connects the document store, falling back to
    /// the volatile store when Qdrant is unreachable.
    pub async fn initialize(config: &AppConfig) -> Result<Self> {
        let memory = connect_memory(config).await?;

        let chat: Arc<dyn ChatService> = if config.openai.chat_enabled {
            Arc::new(AzureOpenAIChat::new(&config.openai)?)
        } else {
            tracing::warn!("Chat completion disabled; rag answers will use the fallback text");
            Arc::new(DisabledChat)
        };

        Ok(Self::new(memory, chat, config))
    }

    pub fn memory(&self) -> &SemanticMemory {
        &self.memory
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn backend(&self) -> StoreBackend {
        self.memory.backend()
    }

    pub async fn answer(&self, query: &str, mode: SearchMode) -> String {
        match mode {
            SearchMode::Vector => self
                .perform_vector_search(query)
                .await
                .into_iter()
                .next()
                .map(|hit| hit.text)
                .unwrap_or_else(|| NOT_FOUND_TEXT.to_string()),
            SearchMode::Rag => self.perform_rag_search(query).await,
        }
    }

    /// Never fails: a search error becomes a single synthetic not-found hit.
    pub async fn perform_vector_search(&self, query: &str) -> Vec<SearchResult> {
        match self
            .memory
            .search(&self.collection, query, self.search_limit, self.min_relevance)
            .await
        {
            Ok(results) => results,
            Err(e) => {
                let e = RagError::SearchFailed(e.to_string());
                tracing::error!("{}", e);
                vec![SearchResult::not_found()]
            }
        }
    }

    pub async fn perform_rag_search(&self, query: &str) -> String {
        let results = self.perform_vector_search(query).await;
        let top = match results.into_iter().next() {
            Some(hit) if !hit.is_not_found() => hit,
            _ => {
                tracing::debug!("No grounding record for rag query");
                return NOT_FOUND_ANSWER.to_string();
            }
        };

        let db_record = if top.metadata.is_empty() { top.text } else { top.metadata };

        match self.grounded_response(&db_record, query).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!("Grounded response failed: {}", e);
                NOT_FOUND_ANSWER.to_string()
            }
        }
    }

    async fn grounded_response(&self, db_record: &str, query: &str) -> Result<String> {
        let prompt = self.prompt.render(&[(DB_RECORD, db_record), (QUERY_TERM, query)])?;
        self.chat.complete(&prompt, &self.settings).await
    }
}

/// Builds the embedding service chosen in configuration and wraps the connected
/// store with it. Shared by the server and the ingestion job.
pub async fn connect_memory(config: &AppConfig) -> Result<SemanticMemory> {
    let dimensions = config.store.index.dimensions;
    let embeddings: Arc<dyn EmbeddingService> = match config.openai.embedding_backend {
        EmbeddingBackend::Azure => Arc::new(AzureOpenAIEmbeddings::new(&config.openai, dimensions)?),
        EmbeddingBackend::Hashed => Arc::new(HashedEmbeddings::new(dimensions)),
    };

    let store = store::connect(&config.store).await?;
    Ok(SemanticMemory::new(store, embeddings))
}
