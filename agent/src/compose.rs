//! Step 5 — COMPOSE: builds the verdict and synthesizes its explanation.

use std::sync::LazyLock;

use futures_lite::StreamExt;
use regex::Regex;

use guardrail_core::domain::{Citation, CoverageStatus, Financials, Verdict};
use guardrail_core::llm::{ComposeContext, LlmProvider};

use crate::agent::PendingCompose;
use crate::error::GuardrailError;

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d[\d,]*").unwrap());

/// Builds the [`ComposeContext`] the composer needs from `pending`'s
/// already-decided facts. Exposed so callers that stream step 5 live
/// (`guardrail-chat`) can drive [`LlmProvider::compose`] themselves with
/// the same context [`compose_pending`] would have built.
#[must_use]
pub fn compose_context(pending: &PendingCompose) -> ComposeContext {
    ComposeContext {
        item: pending.item.clone(),
        status: pending.status,
        supporting_chunks: pending.citations.iter().map(|c| (c.chunk_id.clone(), c.quote.clone())).collect(),
        financials: pending.financials.clone(),
    }
}

/// Runs the composer to completion, collecting its streamed tokens into a
/// single explanation string.
///
/// A real deployment streams these same tokens to the caller as they
/// arrive (`guardrail-chat`'s job); collecting here keeps [`compose_pending`]'s
/// own result type a complete, already-verified [`Verdict`].
async fn compose_text<L: LlmProvider>(llm: &L, context: ComposeContext) -> String {
    let mut stream = llm.compose(context);
    let mut text = String::new();
    while let Some(token) = stream.next().await {
        match token {
            Ok(token) => text.push_str(&token),
            Err(err) => {
                tracing::warn!(%err, "compose stream token failed, explanation may be incomplete");
                break;
            }
        }
    }
    text
}

/// Best-effort check that the composer's explanation is actually about the
/// supplied facts rather than a hallucination: it must say something about
/// the evaluated item or quote from a supporting citation, and it must not
/// state a financial amount absent from the extracted financials. This is
/// not an entailment check — it is the cheap guard `spec` §4.6 step 5 and
/// §7 ask for, not a substitute for the citations being correct upstream.
fn check_grounding(item: &str, composed: &str, citations: &[Citation], financials: Option<&Financials>) -> Result<(), GuardrailError> {
    if composed.trim().is_empty() {
        return Err(GuardrailError::GroundingFailure("composer produced no text".to_string()));
    }

    let lower = composed.to_lowercase();
    if !citations.is_empty() && !lower.contains(&item.to_lowercase()) {
        let quotes_overlap = citations.iter().any(|citation| {
            citation
                .quote
                .split_whitespace()
                .filter(|word| word.len() > 4)
                .any(|word| lower.contains(&word.to_lowercase()))
        });
        if !quotes_overlap {
            return Err(GuardrailError::GroundingFailure(
                "composed explanation references neither the evaluated item nor any supporting citation".to_string(),
            ));
        }
    }

    if let Some(financials) = financials {
        let known: Vec<&str> = financials.deductible.iter().chain(financials.cap.iter()).map(String::as_str).collect();
        if !known.is_empty() {
            for amount in NUMBER_RE.find_iter(composed).map(|m| m.as_str()) {
                if !known.iter().any(|k| k.contains(amount)) {
                    return Err(GuardrailError::GroundingFailure(format!(
                        "composer mentioned amount {amount} not present in extracted financials"
                    )));
                }
            }
        }
    }

    Ok(())
}

pub(crate) fn unknown_verdict(item: &str) -> Verdict {
    Verdict {
        status: CoverageStatus::Unknown,
        item: item.to_string(),
        reason: "I could not find relevant policy text for this question".to_string(),
        confidence: 0.0,
        citations: Vec::new(),
        financials: None,
    }
}

/// Step 5 — composes `pending`'s explanation and builds its [`Verdict`],
/// buffering the composer's tokens internally. A composition that fails
/// the grounding check is downgraded to [`CoverageStatus::Unknown`] with
/// empty citations, per `spec` §7 — the worst a failed turn may claim is
/// that it found nothing, never a fabricated determination.
pub(crate) async fn compose_pending<L: LlmProvider>(llm: &L, pending: PendingCompose) -> Verdict {
    let context = compose_context(&pending);
    let composed = compose_text(llm, context).await;
    finalize(pending, composed)
}

/// Builds the [`Verdict`] for `pending`'s already-decided facts from
/// `composed`, downgrading to [`CoverageStatus::Unknown`] if `composed`
/// fails the grounding check (`spec` §7). Used by [`compose_pending`],
/// which buffers the whole composition first, and by callers that stream
/// the composer's tokens live and only need this check run once streaming
/// finishes (`guardrail-chat`).
pub fn finalize(pending: PendingCompose, composed: String) -> Verdict {
    match check_grounding(&pending.item, &composed, &pending.citations, pending.financials.as_ref()) {
        Ok(()) => Verdict {
            status: pending.status,
            item: pending.item,
            reason: composed,
            confidence: pending.confidence,
            citations: pending.citations,
            financials: pending.financials,
        },
        Err(err) => {
            tracing::warn!(%err, item = pending.item.as_str(), "downgrading verdict to unknown");
            unknown_verdict(&pending.item)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use async_stream::stream;
    use guardrail_core::domain::ChunkKind;
    use guardrail_core::error::Result as ProviderResult;
    use guardrail_core::llm::{ComposeStream, ExclusionEvaluation, InclusionEvaluation};

    use super::*;

    struct StubLlm {
        text: &'static str,
    }

    impl LlmProvider for StubLlm {
        fn classify_chunk(&self, _text: &str, _heading: Option<&str>) -> impl Future<Output = ProviderResult<ChunkKind>> + Send {
            async { Ok(ChunkKind::General) }
        }

        fn evaluate_exclusion(&self, _chunk_text: &str, _item: &str) -> impl Future<Output = ProviderResult<ExclusionEvaluation>> + Send {
            async {
                Ok(ExclusionEvaluation {
                    excluded: false,
                    confidence: 0.0,
                    reason: String::new(),
                })
            }
        }

        fn evaluate_inclusion(&self, _chunk_text: &str, _item: &str) -> impl Future<Output = ProviderResult<InclusionEvaluation>> + Send {
            async {
                Ok(InclusionEvaluation {
                    covered: false,
                    confidence: 0.0,
                    reason: String::new(),
                })
            }
        }

        fn compose(&self, _context: ComposeContext) -> ComposeStream {
            let text = self.text;
            Box::pin(stream! { yield Ok(text.to_string()); })
        }
    }

    fn citation(quote: &str) -> Citation {
        Citation {
            chunk_id: "chunk-1".to_string(),
            page: 8,
            section: None,
            quote: quote.to_string(),
        }
    }

    fn pending(item: &str, status: CoverageStatus, confidence: f32, citations: Vec<Citation>, financials: Option<Financials>) -> PendingCompose {
        PendingCompose {
            item: item.to_string(),
            status,
            confidence,
            citations,
            financials,
        }
    }

    #[tokio::test]
    async fn grounded_composition_keeps_the_verdict() {
        let llm = StubLlm {
            text: "This is excluded because the policy states it does not insure damage you intentionally cause.",
        };
        let verdict = compose_pending(
            &llm,
            pending(
                "intentional damage",
                CoverageStatus::NotCovered,
                0.9,
                vec![citation("We do not insure damage you intentionally cause.")],
                None,
            ),
        )
        .await;
        assert_eq!(verdict.status, CoverageStatus::NotCovered);
        assert_eq!(verdict.confidence, 0.9);
    }

    #[tokio::test]
    async fn ungrounded_composition_is_downgraded_to_unknown() {
        let llm = StubLlm {
            text: "Completely unrelated filler text about something else entirely.",
        };
        let verdict = compose_pending(
            &llm,
            pending(
                "turbo components",
                CoverageStatus::Covered,
                0.8,
                vec![citation("Coverage includes turbo components under Engine coverage.")],
                None,
            ),
        )
        .await;
        assert_eq!(verdict.status, CoverageStatus::Unknown);
        assert!(verdict.citations.is_empty());
        assert_eq!(verdict.confidence, 0.0);
    }

    #[tokio::test]
    async fn hallucinated_amount_is_downgraded_to_unknown() {
        let llm = StubLlm {
            text: "Engine repair is covered, with a deductible of 999 per visit.",
        };
        let financials = Financials {
            deductible: Some("400".to_string()),
            cap: Some("15000".to_string()),
            conditions: None,
        };
        let verdict = compose_pending(
            &llm,
            pending(
                "engine repair",
                CoverageStatus::Covered,
                0.7,
                vec![citation("Coverage includes engine repair.")],
                Some(financials),
            ),
        )
        .await;
        assert_eq!(verdict.status, CoverageStatus::Unknown);
    }

    #[tokio::test]
    async fn empty_composition_is_downgraded_to_unknown() {
        let llm = StubLlm { text: "" };
        let verdict = compose_pending(&llm, pending("flood damage", CoverageStatus::Unknown, 0.0, vec![], None)).await;
        assert_eq!(verdict.status, CoverageStatus::Unknown);
    }

    #[tokio::test]
    async fn finalize_without_a_live_llm_call_applies_the_same_grounding_check() {
        let verdict = finalize(
            pending("intentional damage", CoverageStatus::NotCovered, 0.9, vec![citation("We do not insure damage you intentionally cause.")], None),
            "This is excluded because the policy states it does not insure damage you intentionally cause.".to_string(),
        );
        assert_eq!(verdict.status, CoverageStatus::NotCovered);
    }
}
