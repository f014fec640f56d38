//! Per-session conversation state.
//!
//! `spec` §6: session and message records are purely for transcript replay
//! and are never consulted by the core reasoning — so this is an in-memory
//! log, not a store.

use guardrail_core::domain::PolicyId;

use crate::event::TurnOutcome;

/// One user utterance and the outcome it produced.
#[derive(Debug, Clone)]
pub struct Turn {
    /// The utterance as received.
    pub utterance: String,
    /// How the turn ended.
    pub outcome: TurnOutcome,
}

/// A chat session bound to exactly one policy for its whole lifetime.
#[derive(Debug, Clone)]
pub struct ChatSession {
    /// Caller-supplied session identifier.
    pub session_id: String,
    /// The policy every turn in this session is scoped to.
    pub policy_id: PolicyId,
    /// Turns taken so far, oldest first.
    pub history: Vec<Turn>,
}

impl ChatSession {
    /// Opens a new, empty session bound to `policy_id`.
    #[must_use]
    pub fn new(session_id: impl Into<String>, policy_id: impl Into<PolicyId>) -> Self {
        Self {
            session_id: session_id.into(),
            policy_id: policy_id.into(),
            history: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, utterance: String, outcome: TurnOutcome) {
        self.history.push(Turn { utterance, outcome });
    }
}
