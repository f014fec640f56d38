//! Session-bound streaming orchestrator over the coverage guardrail.
//!
//! [`ChatOrchestrator`] is the only thing in this crate that knows about
//! sessions: it binds each one to a fixed `policy_id`, runs every turn
//! through a [`guardrail_agent::CoverageAgent`], and turns the result into
//! the [`event::TurnEvent`] stream a transport layer forwards to its
//! caller. `spec` §6 scopes HTTP transport and session persistence out of
//! this workspace — this crate stops at the `Stream<Item = TurnEvent>`
//! contract a transport would sit on top of.

#![warn(missing_docs)]

mod orchestrator;
pub mod event;
pub mod error;
pub mod session;

pub use error::{ChatError, Result};
pub use event::{TurnEvent, TurnOutcome};
pub use orchestrator::ChatOrchestrator;
pub use session::{ChatSession, Turn};
