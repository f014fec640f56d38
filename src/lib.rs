//! # guardrail
//!
//! High-level façade crate that re-exports the coverage guardrail's
//! sub-crates behind feature flags. Pull this crate into a binary to
//! extract, chunk, classify, store, retrieve, and reason over insurance
//! policy text without depending on each piece directly.
//!
//! ## What's inside?
//!
//! - [`extract`] — turns raw PDF/DOCX bytes into normalized text blocks.
//! - [`chunk`] — splits and classifies text blocks into `{EXCLUSION,
//!   INCLUSION, DEFINITION, LIMITATION, PROCEDURE, GENERAL}` chunks.
//! - [`store`] — policy-isolated chunk storage, `redb`-persisted, with
//!   HNSW-backed semantic retrieval.
//! - [`agent`] — the fixed-order coverage guardrail: route, probe, compose.
//! - [`chat`] — a session-bound streaming orchestrator on top of the
//!   agent.
//!
//! [`core`] (always available, not feature-gated) carries the domain
//! vocabulary and the two provider capability traits
//! (`EmbeddingProvider`, `LlmProvider`) every other crate here programs
//! against. No concrete provider implementation lives in this workspace —
//! only their contracts, plus a `mock` feature for tests.
//!
//! ## Example
//!
//! ```rust,no_run
//! use guardrail::agent::{CoverageAgent, Deadline};
//! use guardrail::core::mock::{MockEmbeddingProvider, MockLlmProvider};
//! use guardrail::store::{ChunkStore, RedbPersistence};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let persistence = RedbPersistence::new("policies.redb")?;
//! let store = ChunkStore::new(8, persistence);
//! let agent = CoverageAgent::new(MockEmbeddingProvider::new(8), MockLlmProvider, store);
//!
//! let verdict = agent
//!     .answer(
//!         &"policy-123".to_string(),
//!         "Is water damage covered?",
//!         Deadline::after(std::time::Duration::from_secs(10)),
//!     )
//!     .await?;
//! println!("{:?}", verdict.status);
//! # Ok(())
//! # }
//! ```

pub use guardrail_core as core;

#[cfg(feature = "extract")]
pub use guardrail_extract as extract;

#[cfg(feature = "chunk")]
pub use guardrail_chunk as chunk;

#[cfg(feature = "store")]
pub use guardrail_store as store;

#[cfg(feature = "agent")]
pub use guardrail_agent as agent;

#[cfg(feature = "chat")]
pub use guardrail_chat as chat;
