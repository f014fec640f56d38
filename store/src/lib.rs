//! Policy-isolated chunk storage, retrieval, and persistence.
//!
//! A [`ChunkStore`] owns one [`index::PolicyIndex`] per policy, so that a
//! [`ChunkStore::similar`] query can never surface a chunk belonging to a
//! different policy — isolation is a property of the storage layout, not a
//! filter a caller has to remember to apply. Chunks are persisted through a
//! [`persistence::Persistence`] backend; [`persistence::RedbPersistence`] is
//! the only implementation shipped here, following `redb`'s pure-Rust
//! embedded-database model.

#![warn(missing_docs)]

pub mod error;
pub mod index;
pub mod persistence;
mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use persistence::{Persistence, RedbPersistence};
pub use store::ChunkStore;
pub use types::{Chunk, ChunkDraft, ChunkId, ChunkKind, KindFilter, PolicyId, ScoredChunk};
