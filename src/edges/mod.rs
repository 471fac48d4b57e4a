//! Edge types for the knowledge graph.
//!
//! - [`EntityEdge`] — factual relationships between entities (bi-temporal)
//! - [`NodeDuplicate`] — a resolved duplicate assertion between two entity
//!   nodes, materialized downstream as an `IS_DUPLICATE_OF` edge

pub mod entity;

pub use entity::{EntityEdge, NodeDuplicate};
