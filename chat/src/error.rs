//! Orchestrator-level errors.
//!
//! These are request-rejection errors, distinguished from
//! [`guardrail_agent::GuardrailError`] in that they never reach the agent
//! at all — a [`ChatError`] means the turn was refused before any provider
//! call was made.

use thiserror::Error;

/// Failure modes the chat orchestrator can raise before dispatching a turn
/// to the agent.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The caller supplied a `session_id` that has not been opened with
    /// [`crate::ChatOrchestrator::open_session`].
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// The caller's claimed policy does not match the session's bound
    /// policy. This is a request-shape error, not the agent's fatal
    /// `PolicyIsolationViolation` — no provider or store call is made
    /// before this check runs.
    #[error("session {session_id} is bound to policy {bound}, request claimed {claimed}")]
    PolicyMismatch {
        /// The session the mismatched request targeted.
        session_id: String,
        /// The policy the session was opened with.
        bound: String,
        /// The policy the request claimed.
        claimed: String,
    },
}

/// Result alias used throughout the chat orchestrator.
pub type Result<T> = std::result::Result<T, ChatError>;
