//! Per-batch candidate index: MinHash signatures, LSH banding, and the
//! process-wide shingle cache.
//!
//! The index is built fresh from the current "existing" node set at the start
//! of each resolution run and discarded afterwards; only the shingle cache
//! outlives a run (shingle sets are pure functions of the name, so staleness
//! cannot occur).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::dedup::normalize::{normalize_exact, normalize_fuzzy, shingles};
use crate::nodes::EntityNode;

/// Number of independent MinHash hash functions (signature length).
pub const MINHASH_PERMUTATIONS: usize = 32;

/// Number of signature elements per LSH band; trailing partial bands are dropped.
pub const LSH_BAND_SIZE: usize = 4;

/// Minimum true Jaccard similarity for a fuzzy match to be accepted.
pub const FUZZY_JACCARD_THRESHOLD: f64 = 0.9;

/// Concurrent cache of shingle sets keyed by fuzzy-normalized name.
///
/// Safe for concurrent reads and writes; a duplicated compute-and-insert race
/// is acceptable since both sides produce the same value.
#[derive(Debug, Default)]
pub struct ShingleCache {
    inner: DashMap<String, Arc<HashSet<String>>>,
}

impl ShingleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shingle set for a fuzzy-normalized name, computing and
    /// caching it on first sight.
    pub fn get_or_compute(&self, fuzzy_name: &str) -> Arc<HashSet<String>> {
        if let Some(hit) = self.inner.get(fuzzy_name) {
            return Arc::clone(&hit);
        }
        let computed = Arc::new(shingles(fuzzy_name));
        self.inner
            .entry(fuzzy_name.to_string())
            .or_insert(computed)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Per-run immutable candidate index over the existing node set.
#[derive(Debug, Default)]
pub struct CandidateIndexes {
    /// Every candidate node, by uuid.
    pub nodes_by_uuid: HashMap<Uuid, EntityNode>,
    /// Exact-normalized name → candidate uuids (1:N — names may collide).
    pub normalized_existing: HashMap<String, Vec<Uuid>>,
    /// Candidate uuid → shingle set.
    pub shingles_by_candidate: HashMap<Uuid, Arc<HashSet<String>>>,
    /// LSH band key → candidate uuids sharing that band.
    pub lsh_buckets: HashMap<String, Vec<Uuid>>,
}

/// 64-bit hash basis for MinHash: the first 8 bytes (big-endian) of
/// `SHA-256("{seed}:{shingle}")`.
fn seeded_hash(seed: usize, shingle: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(shingle.as_bytes());
    let digest = hasher.finalize();
    u64::from_be_bytes(digest[..8].try_into().expect("SHA-256 digest is 32 bytes"))
}

/// Compute the MinHash signature of a shingle set.
///
/// For each of [`MINHASH_PERMUTATIONS`] seeds, takes the minimum seeded hash
/// over the set. An empty shingle set yields an empty signature.
pub fn minhash_signature(shingles: &HashSet<String>) -> Vec<u64> {
    if shingles.is_empty() {
        return Vec::new();
    }

    (0..MINHASH_PERMUTATIONS)
        .map(|seed| {
            shingles
                .iter()
                .map(|shingle| seeded_hash(seed, shingle))
                .min()
                .expect("non-empty shingle set")
        })
        .collect()
}

/// Split a signature into contiguous bands of [`LSH_BAND_SIZE`] and render
/// each as a bucket key. Trailing partial bands are dropped.
pub fn lsh_band_keys(signature: &[u64]) -> Vec<String> {
    signature
        .chunks_exact(LSH_BAND_SIZE)
        .enumerate()
        .map(|(band_index, band)| {
            let values: Vec<String> = band.iter().map(u64::to_string).collect();
            format!("{}:{}", band_index, values.join("-"))
        })
        .collect()
}

/// Jaccard similarity of two shingle sets.
///
/// Two empty sets are identical in their absence (1.0); one empty and one
/// non-empty share nothing (0.0).
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Build the candidate index over the existing node set.
pub fn build_candidate_indexes(existing: &[EntityNode], cache: &ShingleCache) -> CandidateIndexes {
    let mut indexes = CandidateIndexes::default();

    for node in existing {
        indexes.nodes_by_uuid.insert(node.uuid, node.clone());

        indexes
            .normalized_existing
            .entry(normalize_exact(&node.name))
            .or_default()
            .push(node.uuid);

        let shingle_set = cache.get_or_compute(&normalize_fuzzy(&node.name));
        let signature = minhash_signature(&shingle_set);
        for key in lsh_band_keys(&signature) {
            indexes.lsh_buckets.entry(key).or_default().push(node.uuid);
        }
        indexes
            .shingles_by_candidate
            .insert(node.uuid, shingle_set);
    }

    indexes
}
