//! Edge resolution against the live graph and bi-temporal contradiction
//! invalidation.
//!
//! Each extracted edge is resolved independently: its fact gets an embedding
//! if missing, existing edges between the same endpoints and semantically
//! related edges are gathered, and an LLM verdict collapses duplicates and
//! names contradicted candidates. Collaborator failures degrade the affected
//! edge (treated as novel, invalidation skipped) and never abort siblings —
//! degraded dedup reduces recall, never correctness of the stored data.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::driver::GraphDriver;
use crate::edges::EntityEdge;
use crate::embedder::EmbedderClient;
use crate::errors::Result;
use crate::llm_client::LlmClient;
use crate::prompts::{classify_edge, EdgeClassificationRequest, FactCandidate};
use crate::search::EdgeSearcher;

/// Default cap on related-edge candidates fetched per extracted edge.
pub const DEFAULT_RELATED_LIMIT: usize = 10;

/// Knobs for one [`resolve_extracted_edges`] run.
#[derive(Debug, Clone)]
pub struct EdgeResolutionOptions {
    /// Bypass mode: map every edge to itself with no lookups and no
    /// invalidation.
    pub skip_resolution: bool,
    /// Maximum related edges requested from the searcher.
    pub related_limit: usize,
    /// Attempts per LLM classification exchange.
    pub llm_attempts: usize,
}

impl Default for EdgeResolutionOptions {
    fn default() -> Self {
        Self {
            skip_resolution: false,
            related_limit: DEFAULT_RELATED_LIMIT,
            llm_attempts: crate::prompts::dedupe_edges::DEFAULT_LLM_ATTEMPTS,
        }
    }
}

/// Outcome for one extracted edge.
#[derive(Debug, Clone)]
pub struct ResolvedEdge {
    /// The edge as it should be persisted (possibly an existing edge the
    /// extracted one collapsed into, possibly with a refined relation label).
    pub edge: EntityEdge,
    /// Set when the extracted edge duplicated an existing one.
    pub duplicate_of: Option<Uuid>,
    /// Existing edges this edge contradicted, with their validity intervals
    /// closed.
    pub invalidated: Vec<EntityEdge>,
}

/// Resolve extracted edges against the live graph.
///
/// Edges are processed independently; no ordering between them is assumed.
pub async fn resolve_extracted_edges<D, S, L, E>(
    edges: Vec<EntityEdge>,
    driver: &D,
    search: &S,
    llm: &L,
    embedder: &E,
    options: &EdgeResolutionOptions,
) -> Result<Vec<ResolvedEdge>>
where
    D: GraphDriver + ?Sized,
    S: EdgeSearcher + ?Sized,
    L: LlmClient + ?Sized,
    E: EmbedderClient + ?Sized,
{
    if options.skip_resolution {
        return Ok(edges
            .into_iter()
            .map(|edge| ResolvedEdge {
                edge,
                duplicate_of: None,
                invalidated: Vec::new(),
            })
            .collect());
    }

    let mut resolved = Vec::with_capacity(edges.len());
    for edge in edges {
        resolved.push(resolve_one_edge(edge, driver, search, llm, embedder, options).await);
    }
    Ok(resolved)
}

async fn resolve_one_edge<D, S, L, E>(
    mut edge: EntityEdge,
    driver: &D,
    search: &S,
    llm: &L,
    embedder: &E,
    options: &EdgeResolutionOptions,
) -> ResolvedEdge
where
    D: GraphDriver + ?Sized,
    S: EdgeSearcher + ?Sized,
    L: LlmClient + ?Sized,
    E: EmbedderClient + ?Sized,
{
    if edge.fact_embedding.is_none() {
        match embedder.embed(&edge.fact).await {
            Ok(embedding) => edge.fact_embedding = Some(embedding),
            Err(e) => {
                warn!(edge = %edge.uuid, error = %e, "fact embedding failed, continuing without");
            }
        }
    }

    let between = match driver
        .get_between_nodes(edge.source_node_uuid, edge.target_node_uuid)
        .await
    {
        Ok(edges) => edges,
        Err(e) => {
            warn!(edge = %edge.uuid, error = %e, "between-nodes lookup failed, treating as empty");
            Vec::new()
        }
    };

    let universe = [edge.source_node_uuid, edge.target_node_uuid];
    let related = match search
        .related_edges(&edge.fact, &universe, options.related_limit)
        .await
    {
        Ok(edges) => edges,
        Err(e) => {
            warn!(edge = %edge.uuid, error = %e, "related-edge search failed, treating as empty");
            Vec::new()
        }
    };

    // Nothing to compare against: the edge is novel by construction.
    if between.is_empty() && related.is_empty() {
        return ResolvedEdge {
            edge,
            duplicate_of: None,
            invalidated: Vec::new(),
        };
    }

    let request = EdgeClassificationRequest {
        new_fact: edge.fact.clone(),
        existing_facts: between
            .iter()
            .enumerate()
            .map(|(i, e)| FactCandidate::from_edge(i as i64, e))
            .collect(),
        invalidation_candidates: related
            .iter()
            .enumerate()
            .map(|(i, e)| FactCandidate::from_edge(i as i64, e))
            .collect(),
    };

    let verdict = match classify_edge(llm, &request, options.llm_attempts).await {
        Ok(verdict) => verdict,
        Err(e) => {
            // Degrade to novel: no dedup this round, never data corruption.
            warn!(edge = %edge.uuid, error = %e, "edge classification failed, treating as novel");
            return ResolvedEdge {
                edge,
                duplicate_of: None,
                invalidated: Vec::new(),
            };
        }
    };

    if let Some(label) = verdict.fact_type {
        if !label.is_empty() {
            edge.name = label;
        }
    }

    // Collapse into the first still-valid duplicate, if any.
    let mut duplicate_of = None;
    for id in verdict.duplicate_facts {
        let existing = &between[id as usize];
        if existing.invalid_at.is_none() {
            debug!(extracted = %edge.uuid, existing = %existing.uuid, "collapsing duplicate edge");
            let mut canonical = existing.clone();
            if canonical.fact_embedding.is_none() {
                canonical.fact_embedding = edge.fact_embedding.clone();
            }
            duplicate_of = Some(canonical.uuid);
            edge = canonical;
            break;
        }
    }

    let contradicted: Vec<EntityEdge> = verdict
        .contradicted_facts
        .iter()
        .map(|&id| related[id as usize].clone())
        .collect();
    let invalidated = resolve_edge_contradictions(&edge, &contradicted, Utc::now());

    ResolvedEdge {
        edge,
        duplicate_of,
        invalidated,
    }
}

/// Apply the bi-temporal contradiction rule.
///
/// A candidate is invalidated only when its validity interval overlaps the
/// resolved edge's and it started strictly before the resolved edge: its
/// `invalid_at` is set to the resolved edge's `valid_at` and its `expired_at`
/// stamped with `now`. Candidates whose interval ended before the resolved
/// edge began (or vice versa) are skipped; candidates starting at or after
/// the resolved edge's start are left untouched.
///
/// A resolved edge with no `valid_at` invalidates nothing.
pub fn resolve_edge_contradictions(
    resolved: &EntityEdge,
    candidates: &[EntityEdge],
    now: DateTime<Utc>,
) -> Vec<EntityEdge> {
    let Some(resolved_start) = resolved.valid_at else {
        return Vec::new();
    };

    let mut invalidated = Vec::new();
    for candidate in candidates {
        // No temporal overlap to adjudicate.
        if let Some(candidate_end) = candidate.invalid_at {
            if candidate_end < resolved_start {
                continue;
            }
        }
        if let (Some(resolved_end), Some(candidate_start)) = (resolved.invalid_at, candidate.valid_at)
        {
            if resolved_end < candidate_start {
                continue;
            }
        }

        match candidate.valid_at {
            Some(candidate_start) if candidate_start < resolved_start => {
                let mut closed = candidate.clone();
                closed.invalid_at = Some(resolved_start);
                closed.expired_at = Some(now);
                invalidated.push(closed);
            }
            // Started at/after the resolved edge, or unknown start: ambiguous
            // precedence, leave untouched.
            _ => {}
        }
    }
    invalidated
}
