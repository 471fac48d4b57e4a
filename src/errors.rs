//! Error types for tempograph.

/// Alias for Results returning [`TempographError`].
pub type Result<T> = std::result::Result<T, TempographError>;

/// Top-level error type for tempograph.
#[derive(Debug, thiserror::Error)]
pub enum TempographError {
    #[error("Driver error: {0}")]
    Driver(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Embedder error: {0}")]
    Embedder(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Edge not found: {0}")]
    EdgeNotFound(String),

    #[error("Resolution failed for episode {episode}: {source}")]
    Resolution {
        episode: String,
        #[source]
        source: Box<TempographError>,
    },

    #[error("Task panicked: {0}")]
    TaskPanic(String),

    #[error("Cancelled")]
    Cancelled,
}

impl TempographError {
    /// Wrap this error with the episode whose resolution produced it.
    pub fn for_episode(self, episode: impl Into<String>) -> Self {
        Self::Resolution {
            episode: episode.into(),
            source: Box::new(self),
        }
    }
}

/// LLM-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Rate limited")]
    RateLimit,

    #[error("Model refused to respond")]
    Refusal,

    #[error("Empty response from LLM")]
    EmptyResponse,

    #[error("Authentication failed")]
    Authentication,

    #[error("API error: HTTP {status} — {message}")]
    Api { status: u16, message: String },
}
