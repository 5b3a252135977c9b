use async_trait::async_trait;
use tracing::trace;

use crate::locks::{LockKeys, LockManager, LockSet};

/// Defers to the storage engine's native row locks.
///
/// Takes nothing in-process: the processor's ordered `fetch_locked` calls are
/// the lock acquisitions, and the rows stay locked until commit or rollback.
#[derive(Debug, Default, Clone, Copy)]
pub struct RowLockManager;

#[async_trait]
impl LockManager for RowLockManager {
    async fn with_locks(&self, keys: &LockKeys) -> LockSet {
        trace!("Deferring locks on accounts [{keys}] to storage row locks");
        LockSet::empty()
    }

    fn name(&self) -> &'static str {
        "row"
    }

    fn relies_on_row_locks(&self) -> bool {
        true
    }
}
