//! `redb`-based embedded database persistence, keyed by policy.

use std::fs;
use std::path::{Path, PathBuf};

use redb::{Database, ReadableTable, TableDefinition};

use guardrail_core::domain::{Chunk, PolicyId};

use crate::error::{Result, StoreError};

use super::Persistence;

const POLICIES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("policies");

/// Embedded, policy-partitioned persistence backed by `redb`.
///
/// Each policy's chunks are stored as a single serialized value under its
/// `policy_id` key, so [`Persistence::save_policy`] and
/// [`Persistence::delete_policy`] are each a single-key write inside one
/// `redb` write transaction — atomic with respect to every other policy.
pub struct RedbPersistence {
    path: PathBuf,
    db: Database,
}

impl std::fmt::Debug for RedbPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbPersistence").field("path", &self.path).finish_non_exhaustive()
    }
}

impl RedbPersistence {
    /// Creates or opens a `redb` persistence backend at `path`.
    ///
    /// # Errors
    /// Returns an error if the database file cannot be created or opened.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let db = Database::create(&path).map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(Self { path, db })
    }

    /// The filesystem path backing this database.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persistence for RedbPersistence {
    fn save_policy(&self, policy_id: &PolicyId, chunks: &[Chunk]) -> Result<()> {
        let write_txn = self.db.begin_write().map_err(|e| StoreError::Database(e.to_string()))?;
        {
            let mut table =
                write_txn.open_table(POLICIES_TABLE).map_err(|e| StoreError::Database(e.to_string()))?;
            let serialized = serde_json::to_vec(chunks).map_err(|e| StoreError::Serialization(e.to_string()))?;
            table
                .insert(policy_id.as_str(), serialized.as_slice())
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }
        write_txn.commit().map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    fn load_policy(&self, policy_id: &PolicyId) -> Result<Vec<Chunk>> {
        let read_txn = self.db.begin_read().map_err(|e| StoreError::Database(e.to_string()))?;
        let table = match read_txn.open_table(POLICIES_TABLE) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Database(e.to_string())),
        };
        let Some(value) = table.get(policy_id.as_str()).map_err(|e| StoreError::Database(e.to_string()))? else {
            return Ok(Vec::new());
        };
        serde_json::from_slice(value.value()).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn delete_policy(&self, policy_id: &PolicyId) -> Result<()> {
        let write_txn = self.db.begin_write().map_err(|e| StoreError::Database(e.to_string()))?;
        {
            let mut table =
                write_txn.open_table(POLICIES_TABLE).map_err(|e| StoreError::Database(e.to_string()))?;
            table.remove(policy_id.as_str()).map_err(|e| StoreError::Database(e.to_string()))?;
        }
        write_txn.commit().map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    fn policy_ids(&self) -> Result<Vec<PolicyId>> {
        let read_txn = self.db.begin_read().map_err(|e| StoreError::Database(e.to_string()))?;
        let table = match read_txn.open_table(POLICIES_TABLE) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Database(e.to_string())),
        };
        let mut ids = Vec::new();
        for result in table.iter().map_err(|e| StoreError::Database(e.to_string()))? {
            let (key, _) = result.map_err(|e| StoreError::Database(e.to_string()))?;
            ids.push(key.value().to_string());
        }
        Ok(ids)
    }
}
