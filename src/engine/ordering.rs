use std::collections::HashMap;

use tokio::sync::watch;

use crate::locks::LockKeys;
use crate::types::AccountNumber;

/// Completion signal of one queued request. Dropping it wakes every request chained behind it.
#[derive(Debug)]
pub struct Turn {
    _done: watch::Sender<()>
}

/// The requests a newly queued request has to wait for.
#[derive(Debug, Default)]
pub struct Predecessors {
    pending: Vec<watch::Receiver<()>>
}

impl Predecessors {
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Resolves once every predecessor finished, successfully or not.
    pub async fn wait(self) {
        for mut predecessor in self.pending {
            //NOTE: Nothing is ever sent, `changed` only returns once the sender is dropped
            let _ = predecessor.changed().await;
        }
    }
}

/// Keeps input order between requests that share an account.
///
/// Every account remembers the last request queued on it. A new request waits
/// for the last request on each of its keys, so requests on one account run in
/// arrival order while requests on disjoint accounts run concurrently.
#[derive(Debug, Default)]
pub struct OrderingTable {
    last: HashMap<AccountNumber, watch::Receiver<()>>
}

impl OrderingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, keys: &LockKeys) -> (Turn, Predecessors) {
        let (done, finished) = watch::channel(());
        let mut pending = Vec::with_capacity(keys.len());

        for key in keys.iter() {
            if let Some(previous) = self.last.insert(key.clone(), finished.clone()) {
                //NOTE: A sender that is already gone has nothing left to wait for
                if previous.has_changed().is_ok() {
                    pending.push(previous);
                }
            }
        }

        (Turn { _done: done }, Predecessors { pending })
    }

    /// Forgets accounts whose last request already finished.
    pub fn prune(&mut self) {
        self.last.retain(|_, finished| finished.has_changed().is_ok());
    }

    pub fn tracked_accounts(&self) -> usize {
        self.last.len()
    }
}
