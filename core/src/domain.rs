//! Core domain vocabulary: chunks, citations, and coverage verdicts.
//!
//! These types are shared by every crate in the workspace so that a
//! `Chunk` produced by the chunker, stored by the chunk store, and cited by
//! the coverage agent is always the same shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies a policy document. Opaque from the caller's perspective;
/// all retrieval is scoped to one `PolicyId` and chunks are never shared
/// across policies.
pub type PolicyId = String;

/// Globally unique identifier for a stored chunk.
pub type ChunkId = String;

/// A dense embedding vector. All vectors produced by one
/// [`EmbeddingProvider`](crate::EmbeddingProvider) share the same length.
pub type Embedding = Vec<f32>;

/// The semantic role a chunk of policy text plays.
///
/// Closed enum: every switch site in the workspace must handle all six
/// variants explicitly. An unrecognized kind is a load-time error, never a
/// silent fallthrough to [`ChunkKind::General`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChunkKind {
    /// Text describing what the policy excludes from coverage.
    Exclusion,
    /// Text describing what the policy includes or pays for.
    Inclusion,
    /// Text defining a term used elsewhere in the policy.
    Definition,
    /// Text describing caps, deductibles, or other financial limits.
    Limitation,
    /// Text describing obligations or required procedures.
    Procedure,
    /// Text that does not fit any of the other kinds.
    General,
}

impl ChunkKind {
    /// All variants, in the order they are defined. Useful for exhaustive
    /// iteration in tests and CLI tooling.
    pub const ALL: [Self; 6] = [
        Self::Exclusion,
        Self::Inclusion,
        Self::Definition,
        Self::Limitation,
        Self::Procedure,
        Self::General,
    ];
}

/// A chunk of normalized policy text, scoped to exactly one policy.
///
/// Chunks are immutable once created: re-ingesting a policy replaces its
/// chunks wholesale rather than editing them in place, and a chunk is
/// destroyed only by deleting the policy that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Globally unique id, assigned by the chunk store at insert time.
    pub id: ChunkId,
    /// The policy this chunk belongs to. Retrieval is always filtered by
    /// this field as a hard pre-filter, never a post-filter rerank.
    pub policy_id: PolicyId,
    /// Normalized chunk text, roughly 500-1000 characters.
    pub text: String,
    /// The semantic role this chunk plays.
    pub kind: ChunkKind,
    /// 1-based page number the chunk was extracted from. A chunk never
    /// spans more than one page.
    pub page_number: u32,
    /// Nearest section heading above the chunk, if one was detected.
    pub section_title: Option<String>,
    /// Monotonic position among chunks of the same policy, assigned in
    /// reading order. Used to break score ties deterministically.
    pub position: u32,
    /// The embedding vector for [`Chunk::text`]. Length must exactly match
    /// the owning store's declared dimension.
    pub embedding: Embedding,
    /// When this chunk was created.
    pub created_at: DateTime<Utc>,
}

/// A chunk not yet assigned an id or position, as produced by the chunker
/// and accepted by a chunk store's batch-insert operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkDraft {
    /// The policy this chunk belongs to.
    pub policy_id: PolicyId,
    /// Normalized chunk text.
    pub text: String,
    /// The semantic role this chunk plays.
    pub kind: ChunkKind,
    /// 1-based page number.
    pub page_number: u32,
    /// Nearest section heading above the chunk, if any.
    pub section_title: Option<String>,
    /// Embedding vector for `text`.
    pub embedding: Embedding,
}

/// One verbatim citation backing a [`Verdict`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// The chunk this citation is drawn from.
    pub chunk_id: ChunkId,
    /// The chunk's page number, repeated here so citations are
    /// self-contained for display purposes.
    pub page: u32,
    /// The chunk's section title, if any.
    pub section: Option<String>,
    /// A verbatim quote from the chunk text supporting the verdict.
    pub quote: String,
}

/// The coverage determination for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoverageStatus {
    /// The policy covers this item outright.
    Covered,
    /// The policy excludes this item.
    NotCovered,
    /// The policy covers this item subject to conditions.
    Conditional,
    /// No relevant policy text was found for this item.
    Unknown,
}

/// Financial terms attached to a coverage determination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Financials {
    /// The deductible amount or description, if found.
    pub deductible: Option<String>,
    /// The coverage cap amount or description, if found.
    pub cap: Option<String>,
    /// Any other conditions attached to the financial terms.
    pub conditions: Option<String>,
}

/// A structured coverage verdict for one item, with citations grounding
/// every claim.
///
/// Invariant (see the workspace's testable properties): a [`Verdict`] with
/// status [`CoverageStatus::Covered`] must have non-empty citations, all of
/// kind [`ChunkKind::Inclusion`], [`ChunkKind::Definition`], or
/// [`ChunkKind::General`]; a [`CoverageStatus::NotCovered`] verdict must
/// have non-empty citations with at least one of kind
/// [`ChunkKind::Exclusion`] or [`ChunkKind::Limitation`]. Claiming
/// [`CoverageStatus::Covered`] without a supporting citation is a
/// correctness bug, not an acceptable degraded response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// The coverage determination.
    pub status: CoverageStatus,
    /// The item the verdict is about, e.g. "water damage".
    pub item: String,
    /// A human-readable explanation of the determination.
    pub reason: String,
    /// Confidence in `[0, 1]`. See the agent's confidence arithmetic: the
    /// decisive step's confidence for `COVERED`/`NOT_COVERED`, the max of
    /// both probes for `CONDITIONAL`, and `0.0` for `UNKNOWN`.
    pub confidence: f32,
    /// Ordered citations supporting the verdict. Empty only when `status`
    /// is `UNKNOWN`.
    pub citations: Vec<Citation>,
    /// Financial terms, populated only when the financial probe ran and
    /// found something.
    pub financials: Option<Financials>,
}
