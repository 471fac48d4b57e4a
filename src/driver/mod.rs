//! Graph database driver abstraction.
//!
//! Defines the [`GraphDriver`] trait that all backend implementations must
//! satisfy. The resolution engine consumes this capability to read existing
//! candidates and persist resolution outcomes; concrete backends (Neo4j,
//! FalkorDB, Kuzu, ...) are interchangeable behind it.

use async_trait::async_trait;
use uuid::Uuid;

use crate::edges::EntityEdge;
use crate::errors::Result;
use crate::nodes::EntityNode;

/// Trait representing a graph database backend.
#[async_trait]
pub trait GraphDriver: Send + Sync {
    /// Health check — verify connectivity to the database.
    async fn ping(&self) -> Result<()>;

    /// Close the connection pool / session.
    async fn close(&self) -> Result<()>;

    /// Insert or update an entity node.
    async fn upsert_node(&self, node: &EntityNode) -> Result<()>;

    /// Insert or update an entity edge.
    async fn upsert_edge(&self, edge: &EntityEdge) -> Result<()>;

    /// Point lookup of an entity node by uuid within a group.
    async fn get_node(&self, uuid: Uuid, group_id: &str) -> Result<EntityNode>;

    /// Point lookup of an entity edge by uuid within a group.
    async fn get_edge(&self, uuid: Uuid, group_id: &str) -> Result<EntityEdge>;

    /// All edges connecting `source` and `target`, in either direction.
    async fn get_between_nodes(&self, source: Uuid, target: Uuid) -> Result<Vec<EntityEdge>>;
}
