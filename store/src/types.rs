//! Storage-facing chunk and retrieval-result shapes.
//!
//! These wrap the shared [`guardrail_core::domain`] types with nothing
//! store-specific added — the store persists exactly the domain `Chunk`
//! shape, not an internal representation that needs translating back.

pub use guardrail_core::domain::{Chunk, ChunkDraft, ChunkId, ChunkKind, PolicyId};

/// A chunk paired with its similarity score from a similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    /// The matching chunk.
    pub chunk: Chunk,
    /// Similarity in `[0, 1]`, computed as `(1 + cosine_similarity) / 2`.
    pub score: f32,
}

/// Restricts a similarity query to chunks of the given kinds.
///
/// Applied as a hard pre-filter on the candidate set before any similarity
/// computation runs, never as a post-filter rerank of an already-ranked
/// result list.
#[derive(Debug, Clone)]
pub struct KindFilter(Vec<ChunkKind>);

impl KindFilter {
    /// No restriction: every kind is admissible.
    #[must_use]
    pub fn any() -> Self {
        Self(ChunkKind::ALL.to_vec())
    }

    /// Restricts to exactly the given kinds.
    #[must_use]
    pub fn only(kinds: impl IntoIterator<Item = ChunkKind>) -> Self {
        Self(kinds.into_iter().collect())
    }

    /// Whether `kind` is admissible under this filter.
    #[must_use]
    pub fn admits(&self, kind: ChunkKind) -> bool {
        self.0.contains(&kind)
    }

    /// Whether this filter admits every kind, and can therefore use the
    /// approximate HNSW graph directly instead of a brute-force scan.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        ChunkKind::ALL.iter().all(|k| self.0.contains(k))
    }
}

impl Default for KindFilter {
    fn default() -> Self {
        Self::any()
    }
}
