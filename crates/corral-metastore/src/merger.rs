//! Per-entity serialization for statistics merges.
//!
//! Statistics updates are expressed as pure transforms over the current
//! value. The registry hands out one async mutex per entity key, so
//! concurrent updates to the same table or partition apply one at a time
//! in submission order while updates to different entities proceed
//! independently. There is deliberately no global lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

/// Registry of per-entity async locks.
///
/// Keys are entity identities: `{db}.{table}` for table statistics and
/// `{db}.{table}/{partition_name}` for partition statistics. Locks are
/// created on first use and retained; entity counts in a metastore are
/// bounded by the catalog size.
#[derive(Debug, Default)]
pub struct EntityLockRegistry {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl EntityLockRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for one entity, waiting in FIFO order behind
    /// earlier holders of the same key.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry mutex is poisoned.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().expect("lock registry poisoned");
            Arc::clone(
                locks
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}

/// Entity key for table-level statistics.
#[must_use]
pub fn table_entity_key(database_name: &str, table_name: &str) -> String {
    format!("{database_name}.{table_name}")
}

/// Entity key for partition-level statistics.
#[must_use]
pub fn partition_entity_key(
    database_name: &str,
    table_name: &str,
    partition_name: &str,
) -> String {
    format!("{database_name}.{table_name}/{partition_name}")
}
