//! The structured LLM operations the coverage guardrail needs.
//!
//! [`LlmProvider`] is deliberately narrow: it is not a general chat/tool
//! framework, only the four operations the guardrail's fixed states call.
//! Every structured call returns a schema-shaped Rust value rather than raw
//! text; a provider that cannot produce a conforming answer should return
//! [`crate::error::ProviderError::InvalidResponse`] rather than guessing.

use std::future::Future;
use std::pin::Pin;

use futures_core::Stream;
use serde::{Deserialize, Serialize};

use crate::domain::ChunkKind;
use crate::error::{ProviderError, Result};

/// The caller's intent, as classified by the guardrail's routing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteIntent {
    /// The user is asking whether something is covered.
    CheckCoverage,
    /// The user is asking what a term means.
    ExplainTerms,
    /// The user is asking about limits, caps, or deductibles.
    GetLimits,
    /// Anything else.
    General,
}

/// The result of probing a single chunk for an exclusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionEvaluation {
    /// Whether the chunk text excludes the item from coverage.
    pub excluded: bool,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// A short explanation, used in the composed verdict's reason.
    pub reason: String,
}

/// The result of probing a single chunk for an inclusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InclusionEvaluation {
    /// Whether the chunk text covers the item.
    pub covered: bool,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// A short explanation, used in the composed verdict's reason.
    pub reason: String,
}

/// A boxed, send-able stream of composed text tokens.
pub type ComposeStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// The structured context handed to [`LlmProvider::compose`].
///
/// Carries exactly the supplied chunks the composer is allowed to draw
/// from; any claim in the composed text that cannot be traced to one of
/// these is a grounding failure at the call site, not something this type
/// enforces itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeContext {
    /// The item the verdict is about.
    pub item: String,
    /// The decided coverage status.
    pub status: crate::domain::CoverageStatus,
    /// Verbatim chunk texts the composer may cite, paired with their
    /// chunk ids so the composer can reference them.
    pub supporting_chunks: Vec<(crate::domain::ChunkId, String)>,
    /// Financial terms found by the financial probe, if any.
    pub financials: Option<crate::domain::Financials>,
}

/// The four structured LLM operations the coverage guardrail needs.
///
/// No concrete implementation lives in this workspace; downstream crates
/// depend only on this trait. A `mock` feature (see [`crate::mock`]) ships
/// a deterministic implementation for tests.
pub trait LlmProvider: Send + Sync {
    /// Classifies a chunk into one of the closed [`ChunkKind`] variants,
    /// given its text and the nearest section heading (if any).
    ///
    /// Used only to refine the chunker's heuristic prior for chunks
    /// classified as `EXCLUSION`, `INCLUSION`, or `LIMITATION` — the
    /// legally costly three. An out-of-enum answer must be surfaced as
    /// [`ProviderError::InvalidResponse`] so the caller can fall back to
    /// the heuristic prior.
    fn classify_chunk(
        &self,
        text: &str,
        heading: Option<&str>,
    ) -> impl Future<Output = Result<ChunkKind>> + Send;

    /// Evaluates whether a chunk excludes an item from coverage.
    fn evaluate_exclusion(
        &self,
        chunk_text: &str,
        item: &str,
    ) -> impl Future<Output = Result<ExclusionEvaluation>> + Send;

    /// Evaluates whether a chunk covers an item.
    fn evaluate_inclusion(
        &self,
        chunk_text: &str,
        item: &str,
    ) -> impl Future<Output = Result<InclusionEvaluation>> + Send;

    /// Composes the final natural-language answer from structured context.
    ///
    /// Unlike the other three operations this is streamable: the returned
    /// stream yields text tokens as they are produced. It is never
    /// retried once any token has been yielded (see the workspace's retry
    /// policy), since a partially-streamed answer cannot be silently
    /// restarted.
    fn compose(&self, context: ComposeContext) -> ComposeStream;
}

/// Maps a [`ProviderError`] to whether the calling step should retry it.
#[must_use]
pub const fn is_retryable(err: &ProviderError) -> bool {
    err.is_retryable()
}
