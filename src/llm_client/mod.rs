//! LLM client abstraction.
//!
//! Provides a trait for calling language models with structured output
//! support (`schemars`-generated JSON schemas). The resolution engine uses it
//! for duplicate/contradiction classification; it never passes dynamic maps,
//! only the typed request structs in [`crate::prompts`].
//!
//! # Implementations
//! - [`openai::OpenAiClient`] — OpenAI GPT-4o (and variants) via `async-openai`.

pub mod openai;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::Result;

/// A chat message for the LLM conversation.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Speaker role in a chat conversation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Trait for LLM clients supporting structured output (JSON schema).
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a request and parse the response as plain text.
    async fn generate(&self, messages: &[Message]) -> Result<String>;

    /// Send a request and parse the response as a structured JSON type.
    ///
    /// Uses JSON schema derived from `T` (via `schemars`) to constrain the model output.
    async fn generate_structured<T>(&self, messages: &[Message]) -> Result<T>
    where
        T: DeserializeOwned + schemars::JsonSchema + Send;
}
