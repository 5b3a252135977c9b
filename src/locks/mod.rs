mod keyed_mutex;
mod keys;
mod row_lock;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::OwnedMutexGuard;

pub use keyed_mutex::KeyedMutexLockManager;
pub use keys::LockKeys;
pub use row_lock::RowLockManager;

/// Acquires exclusive locks on account keys for one unit of work.
///
/// Implementations must acquire strictly in the order `LockKeys` yields,
/// which is the global account order. Two operations sharing keys then
/// always contend on the lowest shared key first and cannot deadlock.
#[async_trait]
pub trait LockManager: Send + Sync + 'static {
    async fn with_locks(&self, keys: &LockKeys) -> LockSet;

    fn name(&self) -> &'static str;

    /// True when mutual exclusion comes from the gateway's `fetch_locked` instead of this manager.
    fn relies_on_row_locks(&self) -> bool {
        false
    }
}

/// Scoped handle over the locks held for one unit of work; dropping it
/// releases them.
#[must_use = "locks are released as soon as the LockSet is dropped"]
#[derive(Debug, Default)]
pub struct LockSet {
    guards: Vec<OwnedMutexGuard<()>>
}

impl LockSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, guard: OwnedMutexGuard<()>) {
        self.guards.push(guard);
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }
}

/// Which lock manager backs the processor.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockMode {
    /// In-process mutex per account key.
    #[default]
    Keyed,
    /// Native row locks taken by the storage backend.
    Row
}

pub fn build_lock_manager(mode: LockMode) -> Arc<dyn LockManager> {
    match mode {
        LockMode::Keyed => Arc::new(KeyedMutexLockManager::new()),
        LockMode::Row => Arc::new(RowLockManager)
    }
}
