//! Cross-episode bulk edge dedup: embedding-similarity prefilter, LLM pair
//! confirmation, uuid compression, and property merge.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::dedup::bulk_nodes::compress_uuid_map;
use crate::edges::EntityEdge;
use crate::embedder::EmbedderClient;
use crate::errors::Result;
use crate::llm_client::LlmClient;
use crate::prompts::{confirm_duplicate, DuplicatePairRequest};
use crate::prompts::dedupe_edges::DEFAULT_LLM_ATTEMPTS;
use crate::utils::concurrency::process_with_workers;
use crate::utils::similarity::cosine_similarity;

/// Minimum fact-embedding cosine similarity for a pair to reach LLM
/// confirmation.
pub const DEFAULT_MIN_DUPLICATE_SCORE: f32 = 0.8;

/// De-duplicate a batch of edges across episodes.
///
/// Embedding cosine similarity is a prefilter only; every candidate pair gets
/// a final yes/no from the model. A failed confirmation (transport error,
/// malformed output, panic) keeps the pair distinct — degraded recall, never
/// a wrong merge. Returns the canonicalized edges regrouped per originating
/// episode plus the compressed duplicate-uuid map.
pub async fn dedupe_edges_bulk<L, E>(
    edges_by_episode: HashMap<Uuid, Vec<EntityEdge>>,
    llm: Arc<L>,
    embedder: &E,
    min_score: f32,
    workers: usize,
) -> Result<(HashMap<Uuid, Vec<EntityEdge>>, HashMap<Uuid, Uuid>)>
where
    L: LlmClient + ?Sized + 'static,
    E: EmbedderClient + ?Sized,
{
    // Flatten in a deterministic order so the pairing scan is reproducible.
    let mut episode_uuids: Vec<Uuid> = edges_by_episode.keys().copied().collect();
    episode_uuids.sort();

    let mut episodes: Vec<(Uuid, Vec<Uuid>)> = Vec::with_capacity(episode_uuids.len());
    let mut flat: Vec<EntityEdge> = Vec::new();
    for episode_uuid in episode_uuids {
        let edges = &edges_by_episode[&episode_uuid];
        episodes.push((episode_uuid, edges.iter().map(|e| e.uuid).collect()));
        flat.extend(edges.iter().cloned());
    }

    embed_missing(&mut flat, embedder).await;

    // ── Similarity prefilter: single linear scan ─────────────────────────────
    let mut processed = vec![false; flat.len()];
    let mut candidate_pairs: Vec<(usize, usize)> = Vec::new();
    for i in 0..flat.len() {
        if processed[i] {
            continue;
        }
        let Some(embedding_i) = flat[i].fact_embedding.as_deref() else {
            continue;
        };
        for j in (i + 1)..flat.len() {
            if processed[j] {
                continue;
            }
            let Some(embedding_j) = flat[j].fact_embedding.as_deref() else {
                continue;
            };
            if cosine_similarity(embedding_i, embedding_j) >= min_score {
                candidate_pairs.push((i, j));
                processed[j] = true;
            }
        }
    }
    debug!(
        edges = flat.len(),
        candidates = candidate_pairs.len(),
        "similarity prefilter complete"
    );

    // ── LLM confirmation via the worker pool ─────────────────────────────────
    let requests: Vec<(usize, usize, DuplicatePairRequest)> = candidate_pairs
        .into_iter()
        .map(|(i, j)| {
            let request = DuplicatePairRequest {
                fact_a: flat[i].fact.clone(),
                fact_b: flat[j].fact.clone(),
            };
            (i, j, request)
        })
        .collect();

    let indexed: Vec<(usize, usize)> = requests.iter().map(|(i, j, _)| (*i, *j)).collect();
    let verdicts = if requests.is_empty() {
        Vec::new()
    } else {
        let llm = Arc::clone(&llm);
        process_with_workers(requests, workers, move |(_, _, request)| {
            let llm = Arc::clone(&llm);
            async move { confirm_duplicate(llm.as_ref(), &request, DEFAULT_LLM_ATTEMPTS).await }
        })
        .await?
    };

    let mut confirmed: Vec<(Uuid, Uuid)> = Vec::new();
    for ((i, j), verdict) in indexed.into_iter().zip(verdicts) {
        match verdict {
            Ok(true) => {
                // Orient larger→smaller so each class compresses to its
                // smallest uuid.
                let (a, b) = (flat[i].uuid, flat[j].uuid);
                confirmed.push((a.max(b), a.min(b)));
            }
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "pair confirmation failed, keeping edges distinct");
            }
        }
    }

    let uuid_map = compress_uuid_map(&confirmed);

    // ── Property merge and regrouping ────────────────────────────────────────
    let mut edges_by_uuid: HashMap<Uuid, EntityEdge> = flat
        .into_iter()
        .map(|edge| (edge.uuid, edge))
        .collect();

    for (&duplicate, &canonical) in &uuid_map {
        let Some(source) = edges_by_uuid.get(&duplicate).cloned() else {
            continue;
        };
        if let Some(target) = edges_by_uuid.get_mut(&canonical) {
            if target.name.is_empty() && !source.name.is_empty() {
                target.name = source.name.clone();
            }
            if target.fact.is_empty() && !source.fact.is_empty() {
                target.fact = source.fact;
            }
        }
    }

    let mut regrouped: HashMap<Uuid, Vec<EntityEdge>> = HashMap::new();
    for (episode_uuid, edge_uuids) in episodes {
        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut deduped: Vec<EntityEdge> = Vec::new();
        for edge_uuid in edge_uuids {
            let canonical = uuid_map.get(&edge_uuid).copied().unwrap_or(edge_uuid);
            if seen.insert(canonical) {
                if let Some(edge) = edges_by_uuid.get(&canonical) {
                    deduped.push(edge.clone());
                }
            }
        }
        regrouped.insert(episode_uuid, deduped);
    }

    Ok((regrouped, uuid_map))
}

/// Batch-embed edges that lack a fact embedding. Failure is logged and those
/// edges simply skip the similarity prefilter.
async fn embed_missing<E>(edges: &mut [EntityEdge], embedder: &E)
where
    E: EmbedderClient + ?Sized,
{
    let missing: Vec<usize> = edges
        .iter()
        .enumerate()
        .filter(|(_, e)| e.fact_embedding.is_none())
        .map(|(i, _)| i)
        .collect();
    if missing.is_empty() {
        return;
    }

    let facts: Vec<&str> = missing.iter().map(|&i| edges[i].fact.as_str()).collect();
    match embedder.embed_batch(&facts).await {
        Ok(embeddings) if embeddings.len() == missing.len() => {
            for (&i, embedding) in missing.iter().zip(embeddings) {
                edges[i].fact_embedding = Some(embedding);
            }
        }
        Ok(embeddings) => {
            warn!(
                requested = missing.len(),
                received = embeddings.len(),
                "embedding batch size mismatch, skipping"
            );
        }
        Err(e) => {
            warn!(error = %e, "batch embedding failed, similarity prefilter degraded");
        }
    }
}
