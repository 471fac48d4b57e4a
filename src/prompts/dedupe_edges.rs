//! Edge duplicate/contradiction classification prompts.
//!
//! Two exchanges: [`classify_edge`] asks the model to mark which presented
//! candidates duplicate or contradict a new fact (and optionally refine the
//! relation label), and [`confirm_duplicate`] asks for a final yes/no on a
//! single embedding-similar pair. Candidate ids in the response are indexes
//! into the presented lists; out-of-range ids are dropped, not errored.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::edges::EntityEdge;
use crate::errors::Result;
use crate::llm_client::{LlmClient, Message};
use crate::utils::datetime::format_validity;
use crate::utils::text::truncate_with_ellipsis;

/// Maximum fact length rendered into a prompt.
const MAX_FACT_CHARS: usize = 500;

/// Default number of attempts for one structured-output exchange.
pub const DEFAULT_LLM_ATTEMPTS: usize = 3;

const EDGE_CLASSIFICATION_SYSTEM: &str = "\
You are an expert at de-duplicating and fact-checking relationships in a \
temporal knowledge graph. Given a NEW FACT, a numbered list of EXISTING \
FACTS, and a numbered list of INVALIDATION CANDIDATES, respond with JSON:
- duplicate_facts: ids of EXISTING FACTS stating the same information as the \
new fact (empty if none)
- contradicted_facts: ids of INVALIDATION CANDIDATES the new fact contradicts \
(empty if none)
- fact_type: a concise SCREAMING_SNAKE_CASE relation label for the new fact, \
or null to keep the current label
Only use ids that appear in the lists.";

const DUPLICATE_PAIR_SYSTEM: &str = "\
You are an expert at de-duplicating facts in a knowledge graph. Given two \
facts, decide whether they state the same real-world information. Respond \
with JSON: { \"is_duplicate\": true | false }.";

/// One existing edge rendered for the model, identified by its list index.
#[derive(Debug, Clone, Serialize)]
pub struct FactCandidate {
    pub id: i64,
    pub relation: String,
    pub fact: String,
    /// Human-readable validity interval, e.g. `"2023-01-01 → present"`.
    pub validity: String,
}

impl FactCandidate {
    pub fn from_edge(id: i64, edge: &EntityEdge) -> Self {
        Self {
            id,
            relation: edge.name.clone(),
            fact: truncate_with_ellipsis(&edge.fact, MAX_FACT_CHARS),
            validity: format_validity(edge.valid_at, edge.invalid_at),
        }
    }
}

/// Context for one edge-classification exchange.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeClassificationRequest {
    pub new_fact: String,
    pub existing_facts: Vec<FactCandidate>,
    pub invalidation_candidates: Vec<FactCandidate>,
}

/// Model verdict for one new fact.
///
/// Ids are indexes into the corresponding request lists.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct EdgeClassification {
    pub duplicate_facts: Vec<i64>,
    pub contradicted_facts: Vec<i64>,
    pub fact_type: Option<String>,
}

/// Context for one pair-confirmation exchange.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicatePairRequest {
    pub fact_a: String,
    pub fact_b: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DuplicatePairResponse {
    pub is_duplicate: bool,
}

fn render_candidates(candidates: &[FactCandidate]) -> String {
    if candidates.is_empty() {
        return "(none)".to_string();
    }
    candidates
        .iter()
        .map(|c| format!("{}. [{}] {} ({})", c.id, c.relation, c.fact, c.validity))
        .collect::<Vec<_>>()
        .join("\n")
}

fn classification_messages(request: &EdgeClassificationRequest) -> Vec<Message> {
    let user = format!(
        "NEW FACT:\n{}\n\nEXISTING FACTS:\n{}\n\nINVALIDATION CANDIDATES:\n{}",
        truncate_with_ellipsis(&request.new_fact, MAX_FACT_CHARS),
        render_candidates(&request.existing_facts),
        render_candidates(&request.invalidation_candidates),
    );
    vec![Message::system(EDGE_CLASSIFICATION_SYSTEM), Message::user(user)]
}

fn pair_messages(request: &DuplicatePairRequest) -> Vec<Message> {
    let user = format!(
        "FACT A:\n{}\n\nFACT B:\n{}",
        truncate_with_ellipsis(&request.fact_a, MAX_FACT_CHARS),
        truncate_with_ellipsis(&request.fact_b, MAX_FACT_CHARS),
    );
    vec![Message::system(DUPLICATE_PAIR_SYSTEM), Message::user(user)]
}

/// Drop ids that do not index into `candidates`.
fn retain_valid_ids(ids: &mut Vec<i64>, candidates: &[FactCandidate]) {
    ids.retain(|&id| id >= 0 && (id as usize) < candidates.len());
}

/// Classify a new fact against existing and invalidation candidates, with
/// bounded retries on transport or structured-output failure.
///
/// Returns the last error after `attempts` failures; the caller decides how
/// to degrade.
pub async fn classify_edge<L>(
    llm: &L,
    request: &EdgeClassificationRequest,
    attempts: usize,
) -> Result<EdgeClassification>
where
    L: LlmClient + ?Sized,
{
    let messages = classification_messages(request);
    let attempts = attempts.max(1);

    let mut last_err = None;
    for attempt in 1..=attempts {
        match llm.generate_structured::<EdgeClassification>(&messages).await {
            Ok(mut classification) => {
                retain_valid_ids(&mut classification.duplicate_facts, &request.existing_facts);
                retain_valid_ids(
                    &mut classification.contradicted_facts,
                    &request.invalidation_candidates,
                );
                return Ok(classification);
            }
            Err(e) => {
                warn!(attempt, error = %e, "edge classification attempt failed");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or(crate::errors::TempographError::Llm(
        crate::errors::LlmError::EmptyResponse,
    )))
}

/// Ask the model for a final yes/no on one embedding-similar fact pair, with
/// bounded retries.
pub async fn confirm_duplicate<L>(
    llm: &L,
    request: &DuplicatePairRequest,
    attempts: usize,
) -> Result<bool>
where
    L: LlmClient + ?Sized,
{
    let messages = pair_messages(request);
    let attempts = attempts.max(1);

    let mut last_err = None;
    for attempt in 1..=attempts {
        match llm
            .generate_structured::<DuplicatePairResponse>(&messages)
            .await
        {
            Ok(response) => return Ok(response.is_duplicate),
            Err(e) => {
                warn!(attempt, error = %e, "duplicate confirmation attempt failed");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or(crate::errors::TempographError::Llm(
        crate::errors::LlmError::EmptyResponse,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{LlmError, TempographError};
    use async_trait::async_trait;
    use serde::de::DeserializeOwned;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn candidate(id: i64, fact: &str) -> FactCandidate {
        FactCandidate {
            id,
            relation: "WORKS_AT".to_string(),
            fact: fact.to_string(),
            validity: "unknown".to_string(),
        }
    }

    /// Yields canned JSON responses in order, failing once drained.
    struct ScriptedLlm {
        responses: Vec<String>,
        calls: AtomicUsize,
    }

    impl ScriptedLlm {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: responses.iter().map(|s| s.to_string()).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn generate(&self, _messages: &[Message]) -> Result<String> {
            unimplemented!("not used by prompt wrappers")
        }

        async fn generate_structured<T>(&self, _messages: &[Message]) -> Result<T>
        where
            T: DeserializeOwned + schemars::JsonSchema + Send,
        {
            let index = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.responses.get(index) {
                Some(raw) => Ok(serde_json::from_str(raw)?),
                None => Err(TempographError::Llm(LlmError::EmptyResponse)),
            }
        }
    }

    fn request(existing: usize, invalidation: usize) -> EdgeClassificationRequest {
        EdgeClassificationRequest {
            new_fact: "Alice works at Acme".to_string(),
            existing_facts: (0..existing as i64)
                .map(|i| candidate(i, "Alice works at Acme Corp"))
                .collect(),
            invalidation_candidates: (0..invalidation as i64)
                .map(|i| candidate(i, "Alice works at Beta"))
                .collect(),
        }
    }

    #[tokio::test]
    async fn classify_returns_parsed_verdict() {
        let llm = ScriptedLlm::new(&[
            r#"{"duplicate_facts": [0], "contradicted_facts": [1], "fact_type": "WORKS_AT"}"#,
        ]);
        let verdict = classify_edge(&llm, &request(2, 2), 3).await.unwrap();

        assert_eq!(verdict.duplicate_facts, vec![0]);
        assert_eq!(verdict.contradicted_facts, vec![1]);
        assert_eq!(verdict.fact_type.as_deref(), Some("WORKS_AT"));
    }

    #[tokio::test]
    async fn classify_drops_out_of_range_ids() {
        let llm = ScriptedLlm::new(&[
            r#"{"duplicate_facts": [0, 7, -1], "contradicted_facts": [99], "fact_type": null}"#,
        ]);
        let verdict = classify_edge(&llm, &request(1, 1), 3).await.unwrap();

        assert_eq!(verdict.duplicate_facts, vec![0]);
        assert!(verdict.contradicted_facts.is_empty());
    }

    #[tokio::test]
    async fn classify_retries_then_succeeds() {
        let llm = ScriptedLlm::new(&[
            "not json at all",
            r#"{"duplicate_facts": [], "contradicted_facts": [], "fact_type": null}"#,
        ]);
        let verdict = classify_edge(&llm, &request(1, 0), 3).await.unwrap();

        assert!(verdict.duplicate_facts.is_empty());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn classify_exhausts_attempts_and_errors() {
        let llm = ScriptedLlm::new(&["bad", "bad", "bad"]);
        let err = classify_edge(&llm, &request(1, 0), 3).await.unwrap_err();

        assert!(matches!(err, TempographError::Serialization(_)));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn confirm_parses_yes_and_no() {
        let llm = ScriptedLlm::new(&[r#"{"is_duplicate": true}"#, r#"{"is_duplicate": false}"#]);
        let pair = DuplicatePairRequest {
            fact_a: "Alice works at Acme".to_string(),
            fact_b: "Alice is employed by Acme".to_string(),
        };

        assert!(confirm_duplicate(&llm, &pair, 1).await.unwrap());
        assert!(!confirm_duplicate(&llm, &pair, 1).await.unwrap());
    }

    #[test]
    fn candidate_rendering_numbers_and_labels() {
        let rendered = render_candidates(&[candidate(0, "Alice works at Acme")]);
        assert!(rendered.starts_with("0. [WORKS_AT] Alice works at Acme"));
        assert_eq!(render_candidates(&[]), "(none)");
    }

    #[test]
    fn fact_candidate_truncates_long_facts() {
        let long_fact = "x".repeat(2 * MAX_FACT_CHARS);
        let edge = EntityEdge::new(
            uuid::Uuid::new_v4(),
            uuid::Uuid::new_v4(),
            "KNOWS",
            long_fact,
        );
        let rendered = FactCandidate::from_edge(0, &edge);
        assert!(rendered.fact.chars().count() <= MAX_FACT_CHARS);
        assert!(rendered.fact.ends_with("..."));
    }
}
