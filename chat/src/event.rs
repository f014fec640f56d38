//! The streamed turn-event protocol.

use guardrail_core::domain::Verdict;

/// One event in a turn's event stream. A transport layer sits on top of
/// this (`spec` §6's line-delimited event format is out of scope here) and
/// forwards [`TurnEvent::Token`] as they arrive, ending on
/// [`TurnEvent::Trailer`].
#[derive(Debug, Clone)]
pub enum TurnEvent {
    /// A piece of the composer's explanation, in emission order.
    Token(String),
    /// The terminal event for the turn. Always the last event emitted.
    Trailer(TurnOutcome),
}

/// The sentinel terminal event `spec` §6 calls for: exactly one of these
/// closes every turn, whatever the composer stream did along the way.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// The turn reached a complete, grounded verdict.
    Verdict(Verdict),
    /// The turn's deadline elapsed before a verdict was reached. No
    /// partial verdict is ever attached to this variant, even if tokens
    /// were already streamed (`spec` §5).
    Aborted,
    /// The turn failed with a stable code and message.
    Failed {
        /// A stable, machine-readable failure code.
        code: &'static str,
        /// A human-readable message for logs and display.
        message: String,
    },
}
