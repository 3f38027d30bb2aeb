use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::{GenerationConfig, OpenAIConfig};
use crate::error::{RagError, Result};
use crate::models::{ChatCompletionRequest, ChatCompletionResponse, Message};

/// Produces a completion for a fully rendered prompt.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn complete(&self, prompt: &str, settings: &GenerationConfig) -> Result<String>;
}

/// Chat deployment on an Azure OpenAI resource.
pub struct AzureOpenAIChat {
    client: Client,
    url: String,
    api_key: String,
}

impl AzureOpenAIChat {
    pub fn new(config: &OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RagError::GenerationFailed(format!("client build failed: {e}")))?;

        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            config.endpoint.trim_end_matches('/'),
            config.chat_deployment,
            config.api_version,
        );

        tracing::info!("Added Azure OpenAI Chat Service ({})", config.chat_deployment);
        Ok(Self {
            client,
            url,
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ChatService for AzureOpenAIChat {
    async fn complete(&self, prompt: &str, settings: &GenerationConfig) -> Result<String> {
        let request = ChatCompletionRequest {
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            top_p: settings.top_p,
        };

        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::GenerationFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RagError::GenerationFailed(format!(
                "chat request failed: {} - {}",
                status, error_text
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| RagError::GenerationFailed(e.to_string()))?;

        let choice = completion.choices.into_iter().next();
        tracing::debug!(
            id = %completion.id,
            model = %completion.model,
            finish_reason = ?choice.as_ref().and_then(|c| c.finish_reason.as_deref()),
            "chat completion received"
        );

        choice
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RagError::GenerationFailed("completion had no content".to_string()))
    }
}

/// Used when chat is turned off in configuration; every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledChat;

#[async_trait]
impl ChatService for DisabledChat {
    async fn complete(&self, _prompt: &str, _settings: &GenerationConfig) -> Result<String> {
        Err(RagError::GenerationFailed("chat completion is disabled".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_chat_always_fails() {
        let err = DisabledChat
            .complete("hello", &GenerationConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::GenerationFailed(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_generation_failure() {
        let config = OpenAIConfig {
            endpoint: "http://127.0.0.1:1/".to_string(),
            request_timeout_secs: 2,
            ..OpenAIConfig::default()
        };
        let chat = AzureOpenAIChat::new(&config).unwrap();
        let err = chat.complete("hello", &GenerationConfig::default()).await.unwrap_err();
        assert!(matches!(err, RagError::GenerationFailed(_)));
    }
}
