//! Two-pass bulk node resolution across a batch of episodes.
//!
//! Pass 1 resolves each episode's extracted nodes against the persisted graph
//! (through the [`NodeResolver`] collaborator, which may use LLM
//! disambiguation) in bounded parallel. Pass 2 is a strictly sequential
//! cross-episode reconciliation: each decision depends on the canonical set
//! built by all prior decisions, so it must not be parallelized without
//! changing the algorithm's correctness guarantees. All duplicate assertions
//! from both passes are then compressed into a single canonical uuid map.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::dedup::candidates::{build_candidate_indexes, ShingleCache};
use crate::dedup::normalize::normalize_exact;
use crate::dedup::resolver::{resolve_with_similarity, ResolutionState};
use crate::edges::NodeDuplicate;
use crate::errors::Result;
use crate::nodes::{EntityNode, EpisodicNode};
use crate::utils::concurrency::gather_bounded;

/// One episode's extraction output, queued for bulk resolution.
#[derive(Debug, Clone)]
pub struct EpisodeBatch {
    pub episode: EpisodicNode,
    pub previous_episodes: Vec<EpisodicNode>,
    pub extracted_nodes: Vec<EntityNode>,
}

/// Outcome of resolving one episode's nodes against the persisted graph.
#[derive(Debug, Clone, Default)]
pub struct EpisodeResolution {
    /// Extracted nodes replaced by their canonical forms where resolved.
    pub nodes: Vec<EntityNode>,
    /// Extracted uuid → canonical uuid for nodes that resolved to existing ones.
    pub uuid_map: HashMap<Uuid, Uuid>,
    /// Duplicate assertions discovered while resolving.
    pub duplicates: Vec<NodeDuplicate>,
}

/// Collaborator that resolves extracted nodes against the live graph,
/// including LLM disambiguation for nodes the deterministic resolver
/// deferred.
#[async_trait]
pub trait NodeResolver: Send + Sync {
    async fn resolve_extracted_nodes(
        &self,
        extracted: Vec<EntityNode>,
        episode: EpisodicNode,
        previous_episodes: Vec<EpisodicNode>,
    ) -> Result<EpisodeResolution>;
}

/// Final output of bulk resolution.
#[derive(Debug, Default)]
pub struct BulkResolution {
    /// Resolved, de-duplicated node lists keyed by episode uuid
    /// (order-preserving within an episode).
    pub nodes_by_episode: HashMap<Uuid, Vec<EntityNode>>,
    /// Compressed extracted-uuid → canonical-uuid map from both passes.
    pub uuid_map: HashMap<Uuid, Uuid>,
    /// Duplicate assertions from both passes, for materializing
    /// `IS_DUPLICATE_OF` edges downstream.
    pub duplicates: Vec<NodeDuplicate>,
}

/// Compress duplicate assertions into a canonical uuid map.
///
/// Chains resolve to their terminal representative (`A→B, B→C` compresses to
/// `A→C, B→C`). Conflicting assertions for the same source keep the first one
/// seen; cycles are broken deterministically by electing the smallest uuid in
/// the cycle. Identity entries are omitted.
pub fn compress_uuid_map(pairs: &[(Uuid, Uuid)]) -> HashMap<Uuid, Uuid> {
    let mut direct: HashMap<Uuid, Uuid> = HashMap::new();
    for &(old, new) in pairs {
        if old != new {
            direct.entry(old).or_insert(new);
        }
    }

    let mut compressed = HashMap::new();
    for &start in direct.keys() {
        let mut visited = vec![start];
        let mut current = start;

        let terminal = loop {
            match direct.get(&current) {
                Some(&next) => {
                    if let Some(pos) = visited.iter().position(|&seen| seen == next) {
                        // Cycle: elect the smallest member.
                        break *visited[pos..]
                            .iter()
                            .min()
                            .expect("cycle has at least one member");
                    }
                    visited.push(next);
                    current = next;
                }
                None => break current,
            }
        };

        if start != terminal {
            compressed.insert(start, terminal);
        }
    }

    compressed
}

/// Resolve a batch of episodes' extracted nodes into one consistent canonical
/// node set.
///
/// Pass-1 failures abort the whole call (each episode's correctness is
/// required before Pass 2 can safely run on its output); the error names the
/// failing episode.
pub async fn dedupe_nodes_bulk<R>(
    batches: Vec<EpisodeBatch>,
    resolver: Arc<R>,
    max_concurrency: usize,
    cache: Arc<ShingleCache>,
) -> Result<BulkResolution>
where
    R: NodeResolver + ?Sized + 'static,
{
    // ── Pass 1: per-episode resolution against the live graph ────────────────
    let episode_uuids: Vec<Uuid> = batches.iter().map(|b| b.episode.uuid).collect();

    let tasks: Vec<_> = batches
        .into_iter()
        .map(|batch| {
            let resolver = Arc::clone(&resolver);
            // The closure owns its episode's data; nothing is shared between
            // tasks.
            async move {
                resolver
                    .resolve_extracted_nodes(
                        batch.extracted_nodes,
                        batch.episode,
                        batch.previous_episodes,
                    )
                    .await
            }
        })
        .collect();

    let slots = gather_bounded(tasks, max_concurrency).await?;

    let mut per_episode: Vec<(Uuid, EpisodeResolution)> = Vec::with_capacity(slots.len());
    for (episode_uuid, slot) in episode_uuids.into_iter().zip(slots) {
        let resolution = slot.map_err(|e| e.for_episode(episode_uuid.to_string()))?;
        per_episode.push((episode_uuid, resolution));
    }

    // ── Pass 2: sequential cross-episode reconciliation ──────────────────────
    // Intentionally O(n²) in batch size: batches are memory-resident and
    // bounded, and each step depends on the canonical set built so far.
    let mut pairs: Vec<(Uuid, Uuid)> = Vec::new();
    let mut duplicates: Vec<NodeDuplicate> = Vec::new();
    for (_, resolution) in &per_episode {
        pairs.extend(resolution.uuid_map.iter().map(|(&old, &new)| (old, new)));
        duplicates.extend(resolution.duplicates.iter().copied());
    }

    let mut canonical: Vec<EntityNode> = Vec::new();
    for (_, resolution) in &per_episode {
        for node in &resolution.nodes {
            if canonical.is_empty() {
                canonical.push(node.clone());
                continue;
            }

            let exact_key = normalize_exact(&node.name);
            if let Some(hit) = canonical
                .iter()
                .find(|candidate| normalize_exact(&candidate.name) == exact_key)
            {
                if hit.uuid != node.uuid {
                    pairs.push((node.uuid, hit.uuid));
                    duplicates.push(NodeDuplicate::new(node.uuid, hit.uuid));
                }
                continue;
            }

            let indexes = build_candidate_indexes(&canonical, &cache);
            let mut state = ResolutionState::new(1);
            resolve_with_similarity(std::slice::from_ref(node), &indexes, &mut state, &cache);

            match state.resolved.first().and_then(Clone::clone) {
                Some(matched) => {
                    if matched.uuid != node.uuid {
                        pairs.push((node.uuid, matched.uuid));
                        duplicates.push(NodeDuplicate::new(node.uuid, matched.uuid));
                    }
                }
                None => canonical.push(node.clone()),
            }
        }
    }

    // ── Closure and per-episode regrouping ───────────────────────────────────
    let uuid_map = compress_uuid_map(&pairs);
    debug!(
        pairs = pairs.len(),
        classes = uuid_map.len(),
        "compressed duplicate assertions"
    );

    let mut nodes_by_uuid: HashMap<Uuid, EntityNode> = HashMap::new();
    for (_, resolution) in &per_episode {
        for node in &resolution.nodes {
            nodes_by_uuid.entry(node.uuid).or_insert_with(|| node.clone());
        }
    }

    let mut nodes_by_episode: HashMap<Uuid, Vec<EntityNode>> = HashMap::new();
    for (episode_uuid, resolution) in per_episode {
        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut deduped: Vec<EntityNode> = Vec::new();
        for node in resolution.nodes {
            let canonical_uuid = uuid_map.get(&node.uuid).copied().unwrap_or(node.uuid);
            if seen.insert(canonical_uuid) {
                let canonical_node = nodes_by_uuid
                    .get(&canonical_uuid)
                    .cloned()
                    .unwrap_or(node);
                deduped.push(canonical_node);
            }
        }
        nodes_by_episode.insert(episode_uuid, deduped);
    }

    Ok(BulkResolution {
        nodes_by_episode,
        uuid_map,
        duplicates,
    })
}
