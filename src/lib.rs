//! # tempograph
//!
//! Entity and relationship resolution for temporally-aware knowledge graphs:
//! deciding when extracted nodes and edges refer to things the graph already
//! knows, and keeping bi-temporal validity intervals consistent when new
//! facts contradict old ones.
//!
//! ## Architecture
//!
//! - **Bi-temporal data model**: real-world validity and graph transaction time
//! - **Deterministic-first dedup**: exact match → MinHash/LSH + Jaccard →
//!   LLM disambiguation only for what remains
//! - **Two-pass bulk resolution**: bounded-parallel per-episode resolution,
//!   then sequential cross-episode reconciliation and uuid compression
//! - **Failure isolation**: collaborator errors and panics degrade the
//!   affected unit, never the batch

pub mod edges;
pub mod errors;
pub mod nodes;
pub mod types;

pub mod driver;
pub mod embedder;
pub mod llm_client;

pub mod prompts;
pub mod search;

pub mod dedup;
pub mod utils;

pub use errors::{Result, TempographError};
