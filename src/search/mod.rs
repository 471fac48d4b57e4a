//! Search subsystem interface.
//!
//! The hybrid search pipeline (BM25 + vector cosine similarity + RRF/MMR
//! reranking) lives behind the [`EdgeSearcher`] capability; the resolution
//! engine only consumes it as a ranked-candidate source when looking for
//! semantically related edges to adjudicate against.

use async_trait::async_trait;
use uuid::Uuid;

use crate::edges::EntityEdge;
use crate::errors::Result;

/// Capability for finding edges semantically/lexically related to a fact.
#[async_trait]
pub trait EdgeSearcher: Send + Sync {
    /// Return up to `limit` edges related to `fact`, restricted to edges whose
    /// endpoints are within the given uuid universe.
    async fn related_edges(
        &self,
        fact: &str,
        universe: &[Uuid],
        limit: usize,
    ) -> Result<Vec<EntityEdge>>;
}
