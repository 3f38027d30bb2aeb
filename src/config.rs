//! Application configuration.
//!
//! Values come from defaults, then `RAG_`-prefixed environment variables with `__`
//! as the section separator (e.g. `RAG_STORE__COLLECTION_NAME`), then a handful of
//! conventional variable names such as `AZURE_OPENAI_ENDPOINT` and `QDRANT_URL`.

use std::path::PathBuf;

use config::{Config, Environment};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub openai: OpenAIConfig,
    pub store: StoreConfig,
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub page_title: String,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            page_title: "RAG using Rust with Azure OpenAI and Qdrant".to_string(),
            static_dir: PathBuf::from("static"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Azure OpenAI deployment over REST
    #[default]
    Azure,
    /// Local feature hashing, no network access
    Hashed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAIConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub chat_deployment: String,
    pub embedding_deployment: String,
    pub request_timeout_secs: u64,
    /// When false every rag answer falls back to the placeholder text
    pub chat_enabled: bool,
    pub embedding_backend: EmbeddingBackend,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://test-endpoint.openai.com/".to_string(),
            api_key: "VerySecretApiKey".to_string(),
            api_version: "2024-02-01".to_string(),
            chat_deployment: "chat-deployment".to_string(),
            embedding_deployment: "embedding-deployment".to_string(),
            request_timeout_secs: 30,
            chat_enabled: true,
            embedding_backend: EmbeddingBackend::default(),
        }
    }
}

/// Similarity metric used by the vector index
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Similarity {
    #[default]
    Cosine,
    Dot,
    Euclid,
}

/// HNSW index parameters for the document collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Must match the embedding model output (1536 for ada-002 class models)
    pub dimensions: usize,
    pub similarity: Similarity,
    pub m: u64,
    pub ef_construction: u64,
    pub ef_search: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dimensions: 1536,
            similarity: Similarity::Cosine,
            m: 16,
            ef_construction: 64,
            ef_search: 40,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub database_name: String,
    pub collection_name: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub search_limit: usize,
    pub min_relevance: f32,
    pub index: IndexConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
            database_name: "semanticKernel".to_string(),
            collection_name: "textMemory".to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
            search_limit: 1,
            min_relevance: 0.0,
            index: IndexConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Physical collection name; Qdrant has no database level so the two are joined.
    pub fn qualified_collection(&self) -> String {
        format!("{}_{}", self.database_name, self.collection_name)
    }
}

/// Sampling parameters for the grounded answer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            temperature: 0.0,
            top_p: 0.5,
        }
    }
}

const ENV_ALIASES: &[(&str, &str)] = &[
    ("AZURE_OPENAI_ENDPOINT", "openai.endpoint"),
    ("AZURE_OPENAI_API_KEY", "openai.api_key"),
    ("AZURE_OPENAI_CHAT_DEPLOYMENT_NAME", "openai.chat_deployment"),
    ("AZURE_OPENAI_EMBEDDINGS_DEPLOYMENT_NAME", "openai.embedding_deployment"),
    ("QDRANT_URL", "store.url"),
    ("QDRANT_API_KEY", "store.api_key"),
];

impl AppConfig {
    /// Loads configuration from the process environment.
    ///
    /// Call `dotenv::dotenv()` first if a `.env` file should be honoured.
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder().add_source(
            Environment::with_prefix("RAG")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        for (var, key) in ENV_ALIASES {
            builder = builder.set_override_option(*key, std::env::var(var).ok())?;
        }

        let config: AppConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }
}
