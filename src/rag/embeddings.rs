use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::OpenAIConfig;
use crate::error::{RagError, Result};
use super::store::check_dimensions;

/// Turns text into fixed-length vectors for the document store.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Defaults to sequential `embed` calls.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Embedding deployment on an Azure OpenAI resource.
pub struct AzureOpenAIEmbeddings {
    client: Client,
    url: String,
    api_key: String,
    dimensions: usize,
}

impl AzureOpenAIEmbeddings {
    pub fn new(config: &OpenAIConfig, dimensions: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RagError::Embedding {
                provider: "AzureOpenAI",
                message: format!("client build failed: {e}"),
            })?;

        let url = format!(
            "{}/openai/deployments/{}/embeddings?api-version={}",
            config.endpoint.trim_end_matches('/'),
            config.embedding_deployment,
            config.api_version,
        );

        tracing::info!("Added Azure OpenAI Embedding Generation Service ({})", config.embedding_deployment);
        Ok(Self {
            client,
            url,
            api_key: config.api_key.clone(),
            dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingService for AzureOpenAIEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding {
                provider: "AzureOpenAI",
                message: "API returned empty response".to_string(),
            })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(batch_size = texts.len(), "embedding batch");

        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&EmbeddingRequest { input: texts.to_vec() })
            .send()
            .await
            .map_err(|e| RagError::from_embedding_request("AzureOpenAI", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding {
                provider: "AzureOpenAI",
                message: format!("API returned {status}: {body}"),
            });
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RagError::from_embedding_request("AzureOpenAI", e))?;
        parsed.data.sort_by_key(|d| d.index);
        for data in &parsed.data {
            check_dimensions(self.dimensions, &data.embedding)?;
        }

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

}

/// Offline embeddings built by hashing word tokens into a fixed-size vector.
///
/// Texts sharing words land near each other under cosine similarity, which is
/// enough for local runs and tests without a model deployment.
#[derive(Debug, Clone)]
pub struct HashedEmbeddings {
    dimensions: usize,
}

impl HashedEmbeddings {
    pub fn new(dimensions: usize) -> Self {
        tracing::info!("Added hashed embedding service ({} dims)", dimensions);
        Self { dimensions }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return vector;
        }

        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);

        for token in tokens {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&digest[..8]);
            let slot = (u64::from_le_bytes(bucket) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[slot] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingService for HashedEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }

}
