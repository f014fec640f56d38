//! Error types shared by the two provider capability traits.

use thiserror::Error;

/// Result alias used by provider-facing code throughout the workspace.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Failure modes common to embedding and LLM providers.
///
/// Downstream crates decide how to react: [`ProviderError::Unavailable`] is
/// retriable (see the retry policy in `guardrail-agent`), everything else
/// is not.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider could not be reached, timed out, or returned a
    /// transient server error. Safe to retry with backoff.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The input exceeded a hard provider limit. This indicates a
    /// configuration bug upstream (the chunker is supposed to guarantee
    /// inputs stay under provider limits) rather than a transient
    /// condition, so it is never retried.
    #[error("input too large: {0}")]
    InputTooLarge(String),

    /// A structured call returned a response that did not conform to the
    /// expected schema or closed enum. Callers should treat the result as
    /// absent (e.g. classification falls back to the heuristic prior) and
    /// log the occurrence.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether this failure is worth retrying with backoff.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
