//! Steps 2 & 3 — the exclusion and inclusion probes.
//!
//! Both probes retrieve the same way and evaluate the same way; they differ
//! only in kind filter, confidence threshold, and which boolean field of
//! the LLM's structured answer is decisive. [`run_probe`] implements the
//! shared protocol once; [`exclusion_probe`] and [`inclusion_probe`] supply
//! the polarity-specific retrieval and evaluation closures.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

use guardrail_core::domain::{Chunk, ChunkKind, Citation, PolicyId};
use guardrail_core::llm::LlmProvider;
use guardrail_store::{ChunkStore, KindFilter, Persistence};

use crate::config::RetryConfig;
use crate::error::{GuardrailError, Result};
use crate::retry::with_retry;

/// One chunk's evaluation, reduced to the shape both exclusion and
/// inclusion answers share.
struct Evaluation {
    decisive: bool,
    confidence: f32,
    reason: String,
}

/// The outcome of one probe.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    /// The decisive chunk's citation, if any chunk crossed the threshold.
    pub citation: Option<Citation>,
    /// The decisive chunk's confidence, or `0.0` if nothing was decisive.
    pub confidence: f32,
    /// The decisive chunk's reason, or empty if nothing was decisive.
    pub reason: String,
}

impl ProbeOutcome {
    fn none() -> Self {
        Self {
            citation: None,
            confidence: 0.0,
            reason: String::new(),
        }
    }

    /// Whether a chunk crossed the probe's confidence threshold.
    #[must_use]
    pub const fn is_decisive(&self) -> bool {
        self.citation.is_some()
    }
}

fn cite(chunk: &Chunk) -> Citation {
    Citation {
        chunk_id: chunk.id.clone(),
        page: chunk.page_number,
        section: chunk.section_title.clone(),
        quote: chunk.text.clone(),
    }
}

/// Retrieves up to `k` chunks admitted by `kind_filter`, evaluates each
/// against `item` via `evaluate` with concurrency bounded by
/// `fanout_limit`, and returns the highest-confidence chunk whose
/// confidence reaches `tau` — ties broken by lowest chunk position (`spec`
/// §4.6 step 2).
///
/// A [`GuardrailError::ProviderUnavailable`] from any single evaluation,
/// surfacing only once its own retry budget is exhausted, fails the whole
/// probe: the guardrail cannot safely decide coverage on an incomplete
/// view of the retrieved chunks. Any other evaluation failure is logged
/// and that chunk is treated as non-decisive.
async fn run_probe<P, Eval, Fut>(
    store: &ChunkStore<P>,
    policy_id: &PolicyId,
    query: &[f32],
    k: usize,
    kind_filter: KindFilter,
    tau: f32,
    fanout_limit: usize,
    item: &str,
    evaluate: Eval,
) -> Result<ProbeOutcome>
where
    P: Persistence,
    Eval: Fn(Chunk, String) -> Fut,
    Fut: Future<Output = Result<Evaluation>>,
{
    let candidates = store.similar(policy_id, query, k, &kind_filter)?;
    if candidates.is_empty() {
        return Ok(ProbeOutcome::none());
    }
    for scored in &candidates {
        crate::error::assert_policy_isolation(policy_id, &scored.chunk.policy_id);
    }

    let semaphore = Arc::new(Semaphore::new(fanout_limit.max(1)));
    let mut tasks = Vec::with_capacity(candidates.len());
    for scored in candidates {
        let semaphore = Arc::clone(&semaphore);
        let item = item.to_string();
        let evaluate = &evaluate;
        tasks.push(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore is never closed");
            let chunk = scored.chunk;
            let result = evaluate(chunk.clone(), item).await;
            (chunk, result)
        });
    }

    let results = futures::future::join_all(tasks).await;

    let mut best: Option<(Chunk, Evaluation)> = None;
    for (chunk, result) in results {
        let evaluation = match result {
            Ok(evaluation) => evaluation,
            Err(err @ GuardrailError::ProviderUnavailable(_)) => return Err(err),
            Err(err) => {
                tracing::warn!(%err, chunk_id = %chunk.id, "probe evaluation discarded, treated as non-decisive");
                continue;
            }
        };
        if !evaluation.decisive || evaluation.confidence < tau {
            continue;
        }
        let better = match &best {
            None => true,
            Some((best_chunk, best_eval)) => {
                evaluation.confidence > best_eval.confidence
                    || (evaluation.confidence == best_eval.confidence && chunk.position < best_chunk.position)
            }
        };
        if better {
            best = Some((chunk, evaluation));
        }
    }

    Ok(match best {
        Some((chunk, evaluation)) => ProbeOutcome {
            citation: Some(cite(&chunk)),
            confidence: evaluation.confidence,
            reason: evaluation.reason,
        },
        None => ProbeOutcome::none(),
    })
}

/// Step 2 — EXCLUSION_PROBE: retrieves `{EXCLUSION, LIMITATION}` chunks and
/// asks whether any excludes `item` with confidence at or above `tau`.
#[allow(clippy::too_many_arguments)]
pub async fn exclusion_probe<P, L>(
    store: &ChunkStore<P>,
    llm: &L,
    retry: &RetryConfig,
    policy_id: &PolicyId,
    query: &[f32],
    k: usize,
    tau: f32,
    fanout_limit: usize,
    item: &str,
) -> Result<ProbeOutcome>
where
    P: Persistence,
    L: LlmProvider,
{
    tracing::info!(policy_id = %policy_id, item, "exclusion probe");
    let kind_filter = KindFilter::only([ChunkKind::Exclusion, ChunkKind::Limitation]);
    run_probe(store, policy_id, query, k, kind_filter, tau, fanout_limit, item, |chunk, item| {
        let retry = retry.clone();
        async move {
            let evaluation = with_retry(&retry, || async {
                llm.evaluate_exclusion(&chunk.text, &item).await.map_err(GuardrailError::from)
            })
            .await?;
            Ok(Evaluation {
                decisive: evaluation.excluded,
                confidence: evaluation.confidence,
                reason: evaluation.reason,
            })
        }
    })
    .await
}

/// Step 3 — INCLUSION_PROBE: the symmetric protocol over
/// `{INCLUSION, DEFINITION, GENERAL}` chunks.
#[allow(clippy::too_many_arguments)]
pub async fn inclusion_probe<P, L>(
    store: &ChunkStore<P>,
    llm: &L,
    retry: &RetryConfig,
    policy_id: &PolicyId,
    query: &[f32],
    k: usize,
    tau: f32,
    fanout_limit: usize,
    item: &str,
) -> Result<ProbeOutcome>
where
    P: Persistence,
    L: LlmProvider,
{
    tracing::info!(policy_id = %policy_id, item, "inclusion probe");
    let kind_filter = KindFilter::only([ChunkKind::Inclusion, ChunkKind::Definition, ChunkKind::General]);
    run_probe(store, policy_id, query, k, kind_filter, tau, fanout_limit, item, |chunk, item| {
        let retry = retry.clone();
        async move {
            let evaluation = with_retry(&retry, || async {
                llm.evaluate_inclusion(&chunk.text, &item).await.map_err(GuardrailError::from)
            })
            .await?;
            Ok(Evaluation {
                decisive: evaluation.covered,
                confidence: evaluation.confidence,
                reason: evaluation.reason,
            })
        }
    })
    .await
}
