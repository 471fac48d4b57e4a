//! EntityNode — represents a real-world entity extracted from episodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A real-world entity (person, place, concept) extracted from episodes.
///
/// Created by extraction; mutated only by resolution. The `valid_at` /
/// `invalid_at` pair records when the entity was live in the real world
/// (`invalid_at == None` means still live).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityNode {
    pub uuid: Uuid,
    pub name: String,
    pub group_id: String,
    pub labels: Vec<String>,
    pub summary: String,
    pub name_embedding: Option<Vec<f32>>,
    pub attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
    /// When the entity became valid in the real world.
    pub valid_at: Option<DateTime<Utc>>,
    /// When the entity stopped being valid (`None` = still valid).
    pub invalid_at: Option<DateTime<Utc>>,
}

impl EntityNode {
    /// Construct a minimal entity with a fresh v4 uuid.
    pub fn new(name: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            group_id: group_id.into(),
            labels: Vec::new(),
            summary: String::new(),
            name_embedding: None,
            attributes: serde_json::Value::Null,
            created_at: Utc::now(),
            valid_at: None,
            invalid_at: None,
        }
    }
}
