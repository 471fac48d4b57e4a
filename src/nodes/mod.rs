//! Node types for the knowledge graph.
//!
//! Two node types participate in resolution:
//! - [`EntityNode`] — real-world entities (people, places, concepts)
//! - [`EpisodicNode`] — ingested data episodes (messages, documents, JSON records)

pub mod entity;
pub mod episodic;

pub use entity::EntityNode;
pub use episodic::{EpisodeType, EpisodicNode};
