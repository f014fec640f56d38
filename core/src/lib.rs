//! Shared domain types and provider capability traits for the coverage
//! guardrail.
//!
//! This crate has no dependency on any concrete document store, vector
//! index, or AI provider. It defines:
//!
//! - the domain vocabulary shared by every other crate in the workspace
//!   ([`domain`]): chunk kinds, citations, and coverage verdicts;
//! - the two provider capability traits external AI services must implement
//!   ([`embedding::EmbeddingProvider`], [`llm::LlmProvider`]);
//! - the error types those capabilities fail with ([`error`]).
//!
//! Concrete providers (a specific embedding model, a specific LLM API) are
//! intentionally not implemented here or anywhere in this workspace — only
//! their contracts are. Downstream crates program against the traits; the
//! `mock` feature ships deterministic in-memory implementations used by
//! this workspace's own test suites.

#![warn(missing_docs)]

pub mod domain;
pub mod embedding;
pub mod error;
pub mod llm;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use domain::{Chunk, ChunkKind, Citation, CoverageStatus, Financials, Verdict};
pub use embedding::{Embedding, EmbeddingProvider};
pub use error::{ProviderError, Result};
pub use llm::{ExclusionEvaluation, InclusionEvaluation, LlmProvider, RouteIntent};
