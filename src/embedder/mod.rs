//! Embedder client abstraction.
//!
//! Provides a trait for generating vector embeddings from text. The
//! resolution engine uses it to attach fact embeddings before edge dedup.
//!
//! # Implementations
//! - [`openai::OpenAiEmbedder`] — OpenAI `text-embedding-3-small` (1536-dim)
//!   via `async-openai`.

pub mod openai;

use async_trait::async_trait;

use crate::errors::Result;

/// A vector embedding (f32 components).
pub type Embedding = Vec<f32>;

/// Trait for text-to-vector embedding clients.
#[async_trait]
pub trait EmbedderClient: Send + Sync {
    /// Generate an embedding for a single text string.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Generate embeddings for a batch of texts.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Returns the dimensionality of embeddings produced by this client.
    fn dim(&self) -> usize;
}
