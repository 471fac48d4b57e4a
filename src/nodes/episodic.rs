//! EpisodicNode — represents an ingested data episode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The source type of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodeType {
    Message,
    Json,
    Text,
}

/// An ingested data episode (message, document, JSON record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodicNode {
    pub uuid: Uuid,
    pub name: String,
    pub group_id: String,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub source: EpisodeType,
    pub source_description: String,
    pub content: String,
    pub valid_at: DateTime<Utc>,
    /// UUIDs of entity edges extracted from this episode.
    pub entity_edges: Vec<Uuid>,
}

impl EpisodicNode {
    /// Construct a minimal text episode with a fresh v4 uuid.
    pub fn new_text(name: impl Into<String>, group_id: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            group_id: group_id.into(),
            labels: Vec::new(),
            created_at: now,
            source: EpisodeType::Text,
            source_description: String::new(),
            content: content.into(),
            valid_at: now,
            entity_edges: Vec::new(),
        }
    }
}
