//! Entity and relationship resolution.
//!
//! The heart of the crate: deciding when an extracted node or edge refers to
//! something the graph already knows, and keeping the graph's bi-temporal
//! validity intervals consistent when new facts contradict old ones.
//!
//! - [`normalize`] — name normal forms, entropy, character shingles.
//! - [`candidates`] — MinHash/LSH candidate index and the shingle cache.
//! - [`resolver`] — the deterministic (LLM-free) similarity resolver.
//! - [`bulk_nodes`] — two-pass cross-episode node resolution and uuid
//!   compression.
//! - [`edges`] — single-edge resolution and temporal contradiction
//!   invalidation.
//! - [`bulk_edges`] — cross-episode edge dedup with LLM pair confirmation.

pub mod bulk_edges;
pub mod bulk_nodes;
pub mod candidates;
pub mod edges;
pub mod normalize;
pub mod resolver;

pub use bulk_edges::{dedupe_edges_bulk, DEFAULT_MIN_DUPLICATE_SCORE};
pub use bulk_nodes::{
    compress_uuid_map, dedupe_nodes_bulk, BulkResolution, EpisodeBatch, EpisodeResolution,
    NodeResolver,
};
pub use candidates::{
    build_candidate_indexes, jaccard, lsh_band_keys, minhash_signature, CandidateIndexes,
    ShingleCache, FUZZY_JACCARD_THRESHOLD, LSH_BAND_SIZE, MINHASH_PERMUTATIONS,
};
pub use edges::{
    resolve_edge_contradictions, resolve_extracted_edges, EdgeResolutionOptions, ResolvedEdge,
};
pub use normalize::{name_entropy, normalize_exact, normalize_fuzzy, shingles, SHINGLE_SIZE};
pub use resolver::{resolve_with_similarity, ResolutionState};
