use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::{OwnedMutexGuard, RwLock};
use tracing::{debug, trace};

use crate::locks::{KeyedMutexLockManager, LockMode};
use crate::models::{Account, NewTransaction, Transaction};
use crate::storage::{AccountRow, Gateway, PersistenceError, TransactionRow, UnitOfWork};
use crate::types::{AccountNumber, Monetary, TransactionId};

#[derive(Debug, Default)]
struct StoreState {
    accounts: HashMap<String, AccountRow>,
    journal: Vec<TransactionRow>
}

#[derive(Debug)]
struct StoreInner {
    state: RwLock<StoreState>,
    next_id: AtomicU64,
    row_locks: Option<KeyedMutexLockManager>,
    closed: AtomicBool
}

impl StoreInner {
    fn ensure_open(&self) -> Result<(), PersistenceError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PersistenceError::Closed);
        }

        Ok(())
    }
}

/// Embedded storage backend holding account and transaction rows in memory.
///
/// Committed state sits behind a single `RwLock`, so a commit touching two
/// accounts becomes visible to readers all at once. With row locks enabled,
/// `fetch_locked` behaves like `SELECT ... FOR UPDATE`.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<StoreInner>
}

impl MemoryStore {
    /// A store without row locking, to be paired with the keyed lock manager.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A store whose `fetch_locked` takes an exclusive row lock.
    pub fn with_row_locks() -> Self {
        Self::build(Some(KeyedMutexLockManager::new()))
    }

    /// The store matching a lock mode: row mode needs `fetch_locked` to lock rows.
    pub fn for_lock_mode(mode: LockMode) -> Self {
        match mode {
            LockMode::Keyed => Self::new(),
            LockMode::Row => Self::with_row_locks()
        }
    }

    fn build(row_locks: Option<KeyedMutexLockManager>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(StoreState::default()),
                next_id: AtomicU64::new(1),
                row_locks,
                closed: AtomicBool::new(false)
            })
        }
    }

    pub fn has_row_locks(&self) -> bool {
        self.inner.row_locks.is_some()
    }

    /// Inserts a new account row. Seeding only; balances change through the processor.
    pub async fn open_account(&self, account: &Account) -> Result<(), PersistenceError> {
        self.inner.ensure_open()?;

        let mut state = self.inner.state.write().await;
        let key = account.account_number.to_string();

        if state.accounts.contains_key(&key) {
            return Err(PersistenceError::DuplicateRow(key));
        }

        state.accounts.insert(key, AccountRow::from_domain(account));

        Ok(())
    }

    /// Committed accounts, sorted by account number.
    pub async fn accounts(&self) -> Result<Vec<Account>, PersistenceError> {
        let state = self.inner.state.read().await;
        let mut accounts = state.accounts.values()
            .map(AccountRow::to_domain)
            .collect::<Result<Vec<_>, _>>()?;

        accounts.sort_by(|left, right| left.account_number.cmp(&right.account_number));

        Ok(accounts)
    }

    /// Committed ledger entries in commit order.
    pub async fn journal(&self) -> Result<Vec<Transaction>, PersistenceError> {
        let state = self.inner.state.read().await;

        state.journal.iter().map(TransactionRow::to_domain).collect()
    }

    /// Rejects every later `begin` and open unit of work.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        debug!("Memory store closed");
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gateway for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, PersistenceError> {
        self.inner.ensure_open()?;

        Ok(Box::new(MemoryUnitOfWork::new(self.inner.clone())))
    }

    async fn fetch(&self, account_number: &AccountNumber) -> Result<Option<Account>, PersistenceError> {
        self.inner.ensure_open()?;

        let state = self.inner.state.read().await;

        state.accounts.get(account_number.as_str())
            .map(AccountRow::to_domain)
            .transpose()
    }

    fn locks_rows(&self) -> bool {
        self.has_row_locks()
    }
}

/// Unit of work over a `MemoryStore`; writes are staged until commit.
#[derive(Debug)]
pub struct MemoryUnitOfWork {
    inner: Arc<StoreInner>,
    staged_balances: BTreeMap<String, Decimal>,
    staged_journal: Vec<TransactionRow>,
    row_guards: HashMap<AccountNumber, OwnedMutexGuard<()>>,
    finished: bool
}

impl MemoryUnitOfWork {
    fn new(inner: Arc<StoreInner>) -> Self {
        Self {
            inner,
            staged_balances: BTreeMap::new(),
            staged_journal: Vec::new(),
            row_guards: HashMap::new(),
            finished: false
        }
    }

    fn ensure_active(&self) -> Result<(), PersistenceError> {
        if self.finished {
            return Err(PersistenceError::Finished);
        }

        self.inner.ensure_open()
    }

    async fn read(&self, account_number: &AccountNumber) -> Result<Option<Account>, PersistenceError> {
        let state = self.inner.state.read().await;

        let Some(row) = state.accounts.get(account_number.as_str()) else {
            return Ok(None);
        };

        let mut row = row.clone();

        if let Some(staged) = self.staged_balances.get(account_number.as_str()) {
            row.balance = *staged;
        }

        row.to_domain().map(Some)
    }

    fn finish(&mut self) {
        self.staged_balances.clear();
        self.staged_journal.clear();
        self.row_guards.clear();
        self.finished = true;
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn fetch_locked(&mut self, account_number: &AccountNumber) -> Result<Option<Account>, PersistenceError> {
        self.ensure_active()?;

        if let Some(row_locks) = &self.inner.row_locks {
            if !self.row_guards.contains_key(account_number) {
                let guard = row_locks.lock_key(account_number).await;
                trace!("Row lock on account [{account_number}] acquired");
                self.row_guards.insert(account_number.clone(), guard);
            }
        }

        self.read(account_number).await
    }

    async fn fetch(&mut self, account_number: &AccountNumber) -> Result<Option<Account>, PersistenceError> {
        self.ensure_active()?;
        self.read(account_number).await
    }

    async fn update_balance(&mut self, account_number: &AccountNumber, new_balance: Monetary) -> Result<(), PersistenceError> {
        self.ensure_active()?;

        let exists = self.inner.state.read().await.accounts.contains_key(account_number.as_str());

        if !exists {
            return Err(PersistenceError::MissingRow(account_number.to_string()));
        }

        self.staged_balances.insert(account_number.to_string(), Decimal::from(new_balance));

        Ok(())
    }

    async fn insert_transaction(&mut self, transaction: &NewTransaction) -> Result<TransactionId, PersistenceError> {
        self.ensure_active()?;

        let id = self.inner.next_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| current.checked_add(1))
            .map_err(|_| PersistenceError::Backend("transaction id sequence exhausted".to_string()))?;
        self.staged_journal.push(TransactionRow::from_new(id, transaction));

        Ok(id)
    }

    async fn commit(&mut self) -> Result<(), PersistenceError> {
        self.ensure_active()?;

        {
            let mut state = self.inner.state.write().await;

            if let Some(missing) = self.staged_balances.keys().find(|key| !state.accounts.contains_key(*key)) {
                return Err(PersistenceError::MissingRow(missing.clone()));
            }

            for (key, balance) in &self.staged_balances {
                if let Some(row) = state.accounts.get_mut(key) {
                    row.balance = *balance;
                }
            }

            state.journal.append(&mut self.staged_journal);
        }

        self.finish();

        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), PersistenceError> {
        if !self.finished {
            trace!("Discarding [{}] staged balance(s) and [{}] staged transaction(s)", self.staged_balances.len(), self.staged_journal.len());
            self.finish();
        }

        Ok(())
    }
}
