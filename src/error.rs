use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// The requested search mode is neither `rag` nor `vector`.
    #[error("Invalid option '{0}'. Please choose either 'rag' or 'vector'.")]
    InvalidOption(String),

    #[error("document store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("store error ({backend}): {message}")]
    Store {
        backend: &'static str,
        message: String,
    },

    #[error("embedding error ({provider}): {message}")]
    Embedding {
        provider: &'static str,
        message: String,
    },

    #[error("vector search failed: {0}")]
    SearchFailed(String),

    #[error("generation failed: {0}")]
    GenerationFailed(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("embedding has {actual} dimensions but the collection expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid record at index {index}: {message}")]
    InvalidRecord { index: usize, message: String },

    #[error("prompt template error: {0}")]
    Template(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RagError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RagError::Timeout(_))
    }

    /// Classifies a reqwest failure, keeping timeouts distinguishable for retry.
    pub(crate) fn from_embedding_request(provider: &'static str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RagError::Timeout(format!("{provider} embedding request: {e}"))
        } else {
            RagError::Embedding {
                provider,
                message: format!("request failed: {e}"),
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
