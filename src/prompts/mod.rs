//! Prompt templates and typed LLM request/response contracts.
//!
//! Prompts are stored as Rust string literals (not external files) for
//! compile-time inclusion and zero-cost access. Every LLM exchange goes
//! through a typed request struct rendered into messages and a
//! `schemars`-schema'd response struct, never a dynamic map.

pub mod dedupe_edges;

pub use dedupe_edges::{
    classify_edge, confirm_duplicate, DuplicatePairRequest, DuplicatePairResponse,
    EdgeClassification, EdgeClassificationRequest, FactCandidate,
};
