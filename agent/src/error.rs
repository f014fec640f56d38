//! Errors surfaced by the coverage agent.

use thiserror::Error;

/// Failure modes the guardrail can raise. Every variant other than
/// [`GuardrailError::PolicyIsolationViolation`] is a turn-level failure: it
/// surfaces to the caller with a stable code and message, never as opaque
/// text. `PolicyIsolationViolation` is fatal — it indicates the guardrail
/// dominance invariant itself has been broken, and the process is expected
/// to crash loudly rather than continue in an unknown state.
#[derive(Debug, Error)]
pub enum GuardrailError {
    /// An embedding or LLM provider could not be reached after exhausting
    /// the retry policy.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The chunk store rejected a call for reasons other than the provider
    /// contract (e.g. a dimension mismatch surfaced through it).
    #[error("store error: {0}")]
    Store(#[from] guardrail_store::StoreError),

    /// The composer's answer referenced a claim that could not be traced
    /// back to any supplied chunk. The verdict is downgraded to
    /// [`guardrail_core::domain::CoverageStatus::Unknown`] and this error
    /// is logged for audit, not necessarily returned to the caller.
    #[error("composed answer not grounded in supplied citations: {0}")]
    GroundingFailure(String),

    /// The turn's deadline elapsed before the guardrail could produce a
    /// verdict.
    #[error("cancelled by deadline")]
    CancelledByDeadline,

    /// A chunk from a policy other than the one being queried reached a
    /// probe step. This can only happen if the chunk store's isolation
    /// guarantee has been violated, which is a correctness bug elsewhere,
    /// not a condition this crate can recover from.
    #[error("policy isolation violated: expected {expected}, got {actual}")]
    PolicyIsolationViolation {
        /// The policy the turn was scoped to.
        expected: String,
        /// The policy the offending chunk actually belonged to.
        actual: String,
    },
}

impl GuardrailError {
    /// Whether this failure is worth retrying with backoff. Only
    /// [`GuardrailError::ProviderUnavailable`] is — every other variant
    /// indicates a condition retrying cannot fix.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable(_))
    }
}

impl From<guardrail_core::ProviderError> for GuardrailError {
    fn from(error: guardrail_core::ProviderError) -> Self {
        Self::ProviderUnavailable(error.to_string())
    }
}

/// Result alias used throughout the coverage agent.
pub type Result<T> = std::result::Result<T, GuardrailError>;

/// Crashes the process if `actual` does not match `expected`. Called after
/// every chunk-store retrieval as a defense-in-depth check on the store's
/// isolation guarantee; a mismatch here means that guarantee has already
/// been broken elsewhere, which is not a condition this crate can recover
/// from (`spec` §7).
pub fn assert_policy_isolation(expected: &guardrail_core::domain::PolicyId, actual: &guardrail_core::domain::PolicyId) {
    if expected != actual {
        let err = GuardrailError::PolicyIsolationViolation {
            expected: expected.clone(),
            actual: actual.clone(),
        };
        tracing::error!(%err, "fatal: guardrail isolation invariant violated");
        panic!("{err}");
    }
}
