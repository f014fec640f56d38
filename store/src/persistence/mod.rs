//! Durable, policy-partitioned persistence for the chunk store.
//!
//! Unlike a single flat table of entries, this module keys every record by
//! `policy_id` so that [`Persistence::delete_policy`] can remove a policy's
//! chunks atomically and independently of every other policy's data.

mod redb_backend;

pub use redb_backend::RedbPersistence;

use guardrail_core::domain::{Chunk, PolicyId};

use crate::error::Result;

/// A durable backend for chunk records, partitioned by policy.
pub trait Persistence: Send + Sync {
    /// Replaces all chunks for `policy_id` with `chunks`, atomically.
    fn save_policy(&self, policy_id: &PolicyId, chunks: &[Chunk]) -> Result<()>;

    /// Loads every chunk for `policy_id`. Returns an empty vector if the
    /// policy has never been saved.
    fn load_policy(&self, policy_id: &PolicyId) -> Result<Vec<Chunk>>;

    /// Removes every chunk for `policy_id`.
    fn delete_policy(&self, policy_id: &PolicyId) -> Result<()>;

    /// Lists every policy id with at least one persisted chunk.
    fn policy_ids(&self) -> Result<Vec<PolicyId>>;
}
