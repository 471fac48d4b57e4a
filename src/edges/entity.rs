//! EntityEdge — bi-temporal factual relationship between EntityNodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A factual relationship between two entity nodes, with bi-temporal metadata.
///
/// - **Valid time** (`valid_at` / `invalid_at`): when the fact was true in the real world.
/// - **Transaction time** (`created_at` / `expired_at`): when the edge exists in the graph.
///
/// Invariant: `invalid_at`, when set, is never before `valid_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEdge {
    /// Unique identifier for this edge.
    pub uuid: Uuid,
    /// UUID of the source EntityNode.
    pub source_node_uuid: Uuid,
    /// UUID of the target EntityNode.
    pub target_node_uuid: Uuid,
    /// Relationship label (e.g. "KNOWS", "WORKS_AT").
    pub name: String,
    /// Human-readable fact string.
    pub fact: String,
    /// Optional embedding vector for the fact.
    pub fact_embedding: Option<Vec<f32>>,
    /// When the fact became true in the real world (valid-time start).
    pub valid_at: Option<DateTime<Utc>>,
    /// When the fact ceased to be true in the real world (valid-time end).
    pub invalid_at: Option<DateTime<Utc>>,
    /// When this edge was created in the graph (transaction-time start).
    pub created_at: DateTime<Utc>,
    /// When this edge was superseded in the graph (transaction-time end).
    pub expired_at: Option<DateTime<Utc>>,
    /// Relevance weight (default 1.0).
    pub weight: f64,
    /// Arbitrary JSON attributes.
    pub attributes: serde_json::Value,
    /// Optional group / partition identifier.
    pub group_id: Option<String>,
}

impl EntityEdge {
    /// Construct a minimal edge between two nodes with a fresh v4 uuid.
    pub fn new(
        source_node_uuid: Uuid,
        target_node_uuid: Uuid,
        name: impl Into<String>,
        fact: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            source_node_uuid,
            target_node_uuid,
            name: name.into(),
            fact: fact.into(),
            fact_embedding: None,
            valid_at: None,
            invalid_at: None,
            created_at: Utc::now(),
            expired_at: None,
            weight: 1.0,
            attributes: serde_json::Value::Null,
            group_id: None,
        }
    }
}

/// An unordered duplicate assertion between two entity nodes, produced by the
/// resolver and consumed to build `IS_DUPLICATE_OF` edges and to seed uuid
/// compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDuplicate {
    pub source: Uuid,
    pub target: Uuid,
}

impl NodeDuplicate {
    pub fn new(source: Uuid, target: Uuid) -> Self {
        Self { source, target }
    }
}
