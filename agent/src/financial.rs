//! Step 4 — FINANCIAL_PROBE: pulls deductible/cap/conditions out of
//! limitation chunks.

use std::sync::LazyLock;

use regex::Regex;

use guardrail_core::domain::{Chunk, ChunkKind, Citation, Financials, PolicyId};
use guardrail_store::{ChunkStore, KindFilter, Persistence};

use crate::error::Result;

static DEDUCTIBLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)deductible\s*:?\s*\$?([\d,]+(?:\.\d+)?)").unwrap());
static CAP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:cap|maximum)\s*:?\s*\$?([\d,]+(?:\.\d+)?)").unwrap());
static CONDITION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bper\s+\w+").unwrap());

fn cite(chunk: &Chunk) -> Citation {
    Citation {
        chunk_id: chunk.id.clone(),
        page: chunk.page_number,
        section: chunk.section_title.clone(),
        quote: chunk.text.clone(),
    }
}

/// Pulls whichever of `{deductible, cap, conditions}` `text` contains. The
/// provider capability surface has no dedicated structured-extraction
/// call (`guardrail_core::llm::LlmProvider` covers chunk classification
/// and coverage evaluation only), so regex is the extractor, not a
/// fallback for one.
fn extract(text: &str) -> Financials {
    Financials {
        deductible: DEDUCTIBLE_RE.captures(text).map(|c| c[1].to_string()),
        cap: CAP_RE.captures(text).map(|c| c[1].to_string()),
        conditions: CONDITION_RE.find(text).map(|m| m.as_str().to_string()),
    }
}

/// The outcome of the financial probe: merged financial terms plus the
/// citations they were drawn from. Empty when no limitation chunk yielded
/// anything extractable.
#[derive(Debug, Clone, Default)]
pub struct FinancialOutcome {
    /// Merged financial terms, or `None` if nothing was extractable.
    pub financials: Option<Financials>,
    /// Citations for every chunk that contributed a field.
    pub citations: Vec<Citation>,
}

/// Step 4 — `similar(policy_id, query, k, {LIMITATION})`, merging whichever
/// fields each retrieved chunk's text yields. Earlier chunks (higher
/// score, then lower position) win on a field both match, since
/// [`ChunkStore::similar`] already returns results in that order.
///
/// This step can only add information to a verdict, never overturn one
/// (`spec` §4.6 step 4) — it is the caller's responsibility to not let a
/// `NOT_COVERED` verdict reach this step's output.
pub fn financial_probe<P: Persistence>(
    store: &ChunkStore<P>,
    policy_id: &PolicyId,
    query: &[f32],
    k: usize,
) -> Result<FinancialOutcome> {
    tracing::info!(policy_id = %policy_id, "financial probe");
    let candidates = store.similar(policy_id, query, k, &KindFilter::only([ChunkKind::Limitation]))?;
    for scored in &candidates {
        crate::error::assert_policy_isolation(policy_id, &scored.chunk.policy_id);
    }

    let mut merged = Financials::default();
    let mut citations = Vec::new();
    for scored in candidates {
        let extracted = extract(&scored.chunk.text);
        if extracted.deductible.is_none() && extracted.cap.is_none() && extracted.conditions.is_none() {
            continue;
        }
        citations.push(cite(&scored.chunk));
        merged.deductible = merged.deductible.or(extracted.deductible);
        merged.cap = merged.cap.or(extracted.cap);
        merged.conditions = merged.conditions.or(extracted.conditions);
    }

    let financials = if merged == Financials::default() { None } else { Some(merged) };
    Ok(FinancialOutcome { financials, citations })
}

#[cfg(test)]
mod tests {
    use guardrail_core::domain::ChunkDraft;
    use guardrail_store::RedbPersistence;

    use super::*;

    fn store() -> (tempfile::TempDir, ChunkStore<RedbPersistence>) {
        let dir = tempfile::tempdir().unwrap();
        let persistence = RedbPersistence::new(dir.path().join("store.redb")).unwrap();
        (dir, ChunkStore::new(4, persistence))
    }

    fn draft(text: &str) -> ChunkDraft {
        ChunkDraft {
            policy_id: "policy-a".to_string(),
            text: text.to_string(),
            kind: ChunkKind::Limitation,
            page_number: 5,
            section_title: None,
            embedding: vec![1.0, 0.0, 0.0, 0.0],
        }
    }

    #[test]
    fn extracts_deductible_and_cap() {
        let financials = extract("Deductible: 400 per visit; cap 15000.");
        assert_eq!(financials.deductible.as_deref(), Some("400"));
        assert_eq!(financials.cap.as_deref(), Some("15000"));
        assert_eq!(financials.conditions.as_deref(), Some("per visit"));
    }

    #[test]
    fn missing_fields_are_none() {
        let financials = extract("Notify us within 30 days of loss.");
        assert!(financials.deductible.is_none());
        assert!(financials.cap.is_none());
    }

    #[tokio::test]
    async fn probe_merges_fields_across_chunks_and_cites_contributors() {
        let (_dir, store) = store();
        let policy_id = "policy-a".to_string();
        store
            .put_batch(
                &policy_id,
                vec![
                    draft("Deductible: 400 per visit."),
                    draft("Coverage cap 15000 per incident."),
                    draft("Notify claims within 30 days."),
                ],
            )
            .await
            .unwrap();

        let outcome = financial_probe(&store, &policy_id, &[1.0, 0.0, 0.0, 0.0], 4).unwrap();
        let financials = outcome.financials.unwrap();
        assert_eq!(financials.deductible.as_deref(), Some("400"));
        assert_eq!(financials.cap.as_deref(), Some("15000"));
        assert_eq!(outcome.citations.len(), 2);
    }

    #[tokio::test]
    async fn no_limitation_chunks_yields_no_financials() {
        let (_dir, store) = store();
        let policy_id = "policy-a".to_string();
        let outcome = financial_probe(&store, &policy_id, &[1.0, 0.0, 0.0, 0.0], 4).unwrap();
        assert!(outcome.financials.is_none());
        assert!(outcome.citations.is_empty());
    }
}
