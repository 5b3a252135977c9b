use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

use crate::locks::{LockKeys, LockManager, LockSet};
use crate::types::AccountNumber;

/// Mutex-per-account table for backends without row locking.
///
/// Entries are created lazily and kept for the lifetime of the manager, so a
/// key always maps to the same mutex while anyone can still be waiting on it.
#[derive(Debug, Default)]
pub struct KeyedMutexLockManager {
    table: DashMap<AccountNumber, Arc<Mutex<()>>>
}

impl KeyedMutexLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the exclusive lock on a single key.
    pub async fn lock_key(&self, key: &AccountNumber) -> OwnedMutexGuard<()> {
        //NOTE: The shard guard from `entry` must be released before awaiting the mutex
        let mutex = self.table.entry(key.clone()).or_default().value().clone();
        mutex.lock_owned().await
    }

    #[cfg(test)]
    pub fn tracked_keys(&self) -> usize {
        self.table.len()
    }
}

#[async_trait]
impl LockManager for KeyedMutexLockManager {
    async fn with_locks(&self, keys: &LockKeys) -> LockSet {
        let mut locks = LockSet::empty();

        for key in keys.iter() {
            trace!("Waiting for lock on account [{key}]");
            locks.push(self.lock_key(key).await);
            trace!("Lock on account [{key}] acquired");
        }

        locks
    }

    fn name(&self) -> &'static str {
        "keyed"
    }
}
