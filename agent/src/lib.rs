//! The fixed-order coverage reasoning guardrail.
//!
//! [`CoverageAgent`] binds an [`guardrail_core::embedding::EmbeddingProvider`],
//! an [`guardrail_core::llm::LlmProvider`], and a [`guardrail_store::ChunkStore`]
//! into the five-step protocol `spec` §4.6 requires: ROUTE, EXCLUSION_PROBE,
//! INCLUSION_PROBE, FINANCIAL_PROBE, COMPOSE, run in that fixed order on
//! every turn. The order is a legal invariant, not a tuning knob — there is
//! no configuration surface that can make an exclusion lose to an
//! inclusion.

#![warn(missing_docs)]

mod agent;
pub mod compose;
pub mod config;
pub mod deadline;
pub mod error;
pub mod financial;
pub mod probe;
pub mod retry;
pub mod route;

pub use agent::{CoverageAgent, Decision, GuardrailState, PendingCompose};
pub use config::{GuardrailConfig, RetryConfig};
pub use deadline::Deadline;
pub use error::{GuardrailError, Result};
pub use financial::FinancialOutcome;
pub use probe::ProbeOutcome;
pub use route::RouteOutcome;
