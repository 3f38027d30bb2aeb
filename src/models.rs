use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// HTTP payloads

fn default_message() -> String {
    "Blank".to_string()
}

fn default_option() -> String {
    "rag".to_string()
}

/// Accepts any JSON value, keeping strings as-is and rendering the rest as JSON
/// text, so a mistyped `option` still reaches mode validation.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default = "default_message", deserialize_with = "lenient_string")]
    pub message: String,
    #[serde(default = "default_option", deserialize_with = "lenient_string")]
    pub option: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
}

/// Error body. `answer` mirrors `error` for clients that only read `answer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub answer: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        let error = message.into();
        Self {
            answer: error.clone(),
            error,
        }
    }
}

// Stored documents and search hits

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub text: String,
    pub description: String,
    pub additional_metadata: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

pub const NOT_FOUND_ID: &str = "0";
pub const NOT_FOUND_TEXT: &str = "Not found!";
pub const NOT_FOUND_ANSWER: &str = "The requested data is not Found.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub text: String,
    pub description: String,
    pub metadata: String,
    pub relevance: f32,
}

impl SearchResult {
    pub fn from_record(record: MemoryRecord, relevance: f32) -> Self {
        Self {
            id: record.id,
            text: record.text,
            description: record.description,
            metadata: record.additional_metadata,
            relevance,
        }
    }

    /// Synthetic hit returned in place of a failed search.
    pub fn not_found() -> Self {
        Self {
            id: NOT_FOUND_ID.to_string(),
            text: NOT_FOUND_TEXT.to_string(),
            description: NOT_FOUND_ANSWER.to_string(),
            metadata: NOT_FOUND_ANSWER.to_string(),
            relevance: 0.0,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.id == NOT_FOUND_ID && self.text == NOT_FOUND_TEXT && self.relevance == 0.0
    }
}

// Azure OpenAI chat completion wire types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Content may be null when the response was filtered.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_defaults() {
        let request: ChatRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.message, "Blank");
        assert_eq!(request.option, "rag");
    }

    #[test]
    fn test_chat_request_accepts_mistyped_fields() {
        let request: ChatRequest = serde_json::from_str(r#"{"message": 5, "option": null}"#).unwrap();
        assert_eq!(request.message, "5");
        assert_eq!(request.option, "null");

        let request: ChatRequest = serde_json::from_str(r#"{"option": ["rag"]}"#).unwrap();
        assert_eq!(request.option, r#"["rag"]"#);
    }
}
