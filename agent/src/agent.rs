//! The fixed-order guardrail state machine.
//!
//! `spec` §9: "adding a step is a code change, not configuration." This is
//! deliberately not a graph the teacher's `aither-agent` would recognize —
//! there is no planner deciding what runs next, just [`GuardrailState`]'s
//! five variants dispatched in the one order the domain requires.

use guardrail_core::domain::{Citation, CoverageStatus, Financials, PolicyId, Verdict};
use guardrail_core::embedding::EmbeddingProvider;
use guardrail_core::llm::LlmProvider;
use guardrail_store::{ChunkStore, Persistence};

use crate::compose::{self, unknown_verdict};
use crate::config::GuardrailConfig;
use crate::deadline::Deadline;
use crate::error::{GuardrailError, Result};
use crate::financial::financial_probe;
use crate::probe::{exclusion_probe, inclusion_probe};
use crate::retry::with_retry;
use crate::route::route;

/// The fixed states of one coverage turn (`spec` §4.6). Exposed for
/// observability (logging, metrics); callers never construct one
/// directly — [`CoverageAgent::answer`] drives the transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardrailState {
    /// Step 1: classify intent, extract candidate items.
    Route,
    /// Step 2: does any exclusion chunk rule the item out?
    ExclusionProbe,
    /// Step 3: does any inclusion chunk cover the item?
    InclusionProbe,
    /// Step 4: pull financial terms from limitation chunks.
    FinancialProbe,
    /// Step 5: build and explain the verdict.
    Compose,
}

/// The facts decided by steps 1-4 (`spec` §4.6), not yet composed into an
/// explanation. Exposed so callers that need to stream the composer's
/// tokens live (`guardrail-chat`) can drive step 5 themselves through
/// [`CoverageAgent::llm`] instead of waiting for [`CoverageAgent::answer`]
/// to buffer it.
#[derive(Debug, Clone)]
pub struct PendingCompose {
    /// The coverage item step 1 extracted from the utterance.
    pub item: String,
    /// The status the probes decided for `item`.
    pub status: CoverageStatus,
    /// The confidence attached to `status`.
    pub confidence: f32,
    /// Citations supporting `status`, in probe order.
    pub citations: Vec<Citation>,
    /// Financial terms the financial probe extracted, if any.
    pub financials: Option<Financials>,
}

/// The result of steps 1-4: either a final verdict that needed no composer
/// call (nothing matched), or facts pending step 5.
#[derive(Debug, Clone)]
pub enum Decision {
    /// No item was extracted, or no inclusion chunk was decisive — a
    /// [`Verdict`] the composer was never asked to explain.
    Final(Verdict),
    /// An exclusion, or an inclusion plus the financial probe, decided
    /// `item`'s status; step 5 still needs to compose its explanation.
    Pending(PendingCompose),
}

/// Binds an embedding provider, an LLM provider, and a chunk store into the
/// fixed-order coverage guardrail.
pub struct CoverageAgent<E, L, P: Persistence> {
    embedder: E,
    llm: L,
    store: ChunkStore<P>,
    config: GuardrailConfig,
}

impl<E, L, P> CoverageAgent<E, L, P>
where
    E: EmbeddingProvider,
    L: LlmProvider,
    P: Persistence,
{
    /// Binds the three capabilities with default tuning.
    pub fn new(embedder: E, llm: L, store: ChunkStore<P>) -> Self {
        Self::with_config(embedder, llm, store, GuardrailConfig::default())
    }

    /// Binds the three capabilities with explicit tuning.
    pub fn with_config(embedder: E, llm: L, store: ChunkStore<P>, config: GuardrailConfig) -> Self {
        Self {
            embedder,
            llm,
            store,
            config,
        }
    }

    /// The chunk store backing this agent, for ingestion call sites.
    #[must_use]
    pub fn store(&self) -> &ChunkStore<P> {
        &self.store
    }

    /// The LLM provider bound to this agent, for callers that stream step
    /// 5's composition live (`guardrail-chat`) rather than going through
    /// [`Self::answer`]'s buffered path.
    #[must_use]
    pub fn llm(&self) -> &L {
        &self.llm
    }

    /// Runs steps 1-4 of the guardrail (`spec` §4.6) for `utterance` against
    /// `policy_id`, stopping short of composing an explanation.
    ///
    /// Aborts with [`GuardrailError::CancelledByDeadline`] if `deadline`
    /// elapses before a [`Decision`] is reached. Exposed separately from
    /// [`Self::answer`] so callers that need to stream the composer's
    /// tokens as they are produced can drive step 5 themselves against
    /// [`Self::llm`].
    pub async fn decide(&self, policy_id: &PolicyId, utterance: &str, deadline: Deadline) -> Result<Decision> {
        if deadline.has_elapsed() {
            return Err(GuardrailError::CancelledByDeadline);
        }

        tracing::info!(policy_id = %policy_id, state = ?GuardrailState::Route, "turn started");
        let route_outcome = route(utterance, Some(&self.llm)).await;
        let Some(item) = route_outcome.items.into_iter().next() else {
            return Ok(Decision::Final(unknown_verdict(utterance)));
        };

        if deadline.has_elapsed() {
            return Err(GuardrailError::CancelledByDeadline);
        }

        let query = with_retry(&self.config.retry, || async {
            self.embedder.embed(&item).await.map_err(GuardrailError::from)
        })
        .await?;

        tracing::info!(policy_id = %policy_id, item, state = ?GuardrailState::ExclusionProbe, "turn advancing");
        let exclusion = exclusion_probe(
            &self.store,
            &self.llm,
            &self.config.retry,
            policy_id,
            &query,
            self.config.k_exclusion,
            self.config.tau_exclusion,
            self.config.fanout_limit,
            &item,
        )
        .await?;

        if deadline.has_elapsed() {
            return Err(GuardrailError::CancelledByDeadline);
        }

        if exclusion.is_decisive() {
            let citation = exclusion.citation.expect("decisive probe outcome always carries a citation");
            return Ok(Decision::Pending(PendingCompose {
                item,
                status: CoverageStatus::NotCovered,
                confidence: exclusion.confidence,
                citations: vec![citation],
                financials: None,
            }));
        }

        tracing::info!(policy_id = %policy_id, item, state = ?GuardrailState::InclusionProbe, "turn advancing");
        let inclusion = inclusion_probe(
            &self.store,
            &self.llm,
            &self.config.retry,
            policy_id,
            &query,
            self.config.k_inclusion,
            self.config.tau_inclusion,
            self.config.fanout_limit,
            &item,
        )
        .await?;

        if !inclusion.is_decisive() {
            return Ok(Decision::Final(unknown_verdict(&item)));
        }

        if deadline.has_elapsed() {
            return Err(GuardrailError::CancelledByDeadline);
        }

        tracing::info!(policy_id = %policy_id, item, state = ?GuardrailState::FinancialProbe, "turn advancing");
        let financial = financial_probe(&self.store, policy_id, &query, self.config.k_financial)?;

        let citation = inclusion.citation.expect("decisive probe outcome always carries a citation");
        let mut citations = vec![citation];
        citations.extend(financial.citations.clone());

        let status = if financial.financials.is_some() {
            CoverageStatus::Conditional
        } else {
            CoverageStatus::Covered
        };
        let confidence = if matches!(status, CoverageStatus::Conditional) {
            inclusion.confidence.max(exclusion.confidence)
        } else {
            inclusion.confidence
        };

        tracing::info!(policy_id = %policy_id, item, state = ?GuardrailState::Compose, "turn pending composition");
        Ok(Decision::Pending(PendingCompose {
            item,
            status,
            confidence,
            citations,
            financials: financial.financials,
        }))
    }

    /// Runs one turn of the guardrail for `utterance` against `policy_id`,
    /// aborting with [`GuardrailError::CancelledByDeadline`] if `deadline`
    /// elapses before a verdict is reached. Buffers the composer's tokens
    /// internally; callers that need to stream them live as they are
    /// produced should drive [`Self::decide`] and [`Self::llm`] directly
    /// (`guardrail-chat` does this).
    pub async fn answer(&self, policy_id: &PolicyId, utterance: &str, deadline: Deadline) -> Result<Verdict> {
        match self.decide(policy_id, utterance, deadline).await? {
            Decision::Final(verdict) => Ok(verdict),
            Decision::Pending(pending) => Ok(compose::compose_pending(&self.llm, pending).await),
        }
    }
}
