use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;
use tracing::{debug, error, trace, warn};

use crate::balance::{
    apply_deposit, apply_transfer_in, apply_transfer_out, apply_withdrawal, check_amount_policy, validate_amount,
    validate_sufficient, AmountPolicy, Movement
};
use crate::locks::{LockKeys, LockManager, LockSet};
use crate::models::{Account, LedgerError, NewTransaction, Transaction, TransactionRequest, TransactionType};
use crate::processor::Stage;
use crate::storage::{Gateway, PersistenceError, UnitOfWork};
use crate::types::AccountNumber;

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

type LockedAccounts = BTreeMap<AccountNumber, Account>;

/// Applies deposits, withdrawals and transfers as atomic units of work.
///
/// Every request runs the same pipeline: shape and amount checks without any
/// lock, ordered lock acquisition, a fresh read of every involved account
/// under those locks, balance validation against that read, then staged
/// writes and a single commit. Any failure rolls the unit of work back, so
/// callers never observe a partial update.
pub struct LedgerProcessor {
    gateway: Arc<dyn Gateway>,
    locks: Arc<dyn LockManager>,
    lock_timeout: Duration,
    amount_policy: AmountPolicy
}

impl LedgerProcessor {
    /// Pairs a gateway with a lock manager.
    ///
    /// # Errors
    /// Returns `PersistenceError::RowLocksUnavailable` if the lock manager defers
    /// to row locks the gateway does not take, which would leave requests unlocked.
    pub fn new(gateway: Arc<dyn Gateway>, locks: Arc<dyn LockManager>) -> Result<Self, PersistenceError> {
        if locks.relies_on_row_locks() && !gateway.locks_rows() {
            return Err(PersistenceError::RowLocksUnavailable);
        }

        Ok(Self {
            gateway,
            locks,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            amount_policy: AmountPolicy::default()
        })
    }

    /// Bounds the wait for every lock a request needs, in total.
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn with_amount_policy(mut self, amount_policy: AmountPolicy) -> Self {
        self.amount_policy = amount_policy;
        self
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Processes a single request and returns the persisted ledger entry.
    ///
    /// # Errors
    /// Returns `LedgerError` if:
    /// - The request shape or amount is invalid (checked before any lock).
    /// - An involved account does not exist.
    /// - The origin balance, read after locking, does not cover the amount.
    /// - The locks could not be acquired within the configured timeout.
    /// - The storage backend failed; the unit of work is rolled back.
    pub async fn process(&self, request: &TransactionRequest) -> Result<Transaction, LedgerError> {
        let result = self.run(request).await;

        match &result {
            Ok(transaction) => {
                debug!("Transaction [{}]:[{:?}] of [{}] for account [{}] committed", transaction.id, transaction.transaction_type, transaction.amount, transaction.origin_account_number);
            }
            Err(error @ LedgerError::PersistenceFailure(_)) => {
                error!("{error}");
            }
            Err(error) => {
                warn!("{error}");
            }
        }

        result
    }

    async fn run(&self, request: &TransactionRequest) -> Result<Transaction, LedgerError> {
        request.check_shape()?;
        validate_amount(request.amount).map_err(|error| LedgerError::from_balance(error, request))?;
        check_amount_policy(request.amount, self.amount_policy).map_err(|error| LedgerError::from_balance(error, request))?;

        let keys = LockKeys::for_request(request);
        let mut stage = Stage::Pending;
        let mut held: Option<LockSet> = None;
        let mut unit = self.gateway.begin().await?;

        let executed = self.execute(unit.as_mut(), request, &keys, &mut stage, &mut held).await;

        let outcome = match executed {
            Ok(transaction) => unit.commit().await
                .map(|_| transaction)
                .map_err(LedgerError::from),
            Err(error) => Err(error)
        };

        match outcome {
            Ok(transaction) => {
                stage.advance(Stage::Committed);
                drop(held);
                Ok(transaction)
            }
            Err(error) => {
                trace!("Aborting [{:?}] on account [{}] at stage [{stage:?}]", request.transaction_type, request.origin);
                stage.advance(Stage::Aborted);

                if let Err(rollback_error) = unit.rollback().await {
                    error!("Rollback failed for [{:?}] on account [{}]: {rollback_error}", request.transaction_type, request.origin);
                }

                drop(held);
                Err(error)
            }
        }
    }

    async fn execute(
        &self,
        unit: &mut dyn UnitOfWork,
        request: &TransactionRequest,
        keys: &LockKeys,
        stage: &mut Stage,
        held: &mut Option<LockSet>
    ) -> Result<Transaction, LedgerError> {
        let (locks, mut accounts) = timeout(self.lock_timeout, lock_accounts(self.locks.as_ref(), unit, keys))
            .await
            .map_err(|_| LedgerError::lock_timeout(keys, self.lock_timeout))??;

        *held = Some(locks);
        stage.advance(Stage::LocksAcquired);

        let origin = accounts.get(&request.origin)
            .ok_or_else(|| LedgerError::account_not_found(&request.origin))?;

        if let Some(destination) = &request.destination {
            if !accounts.contains_key(destination) {
                return Err(LedgerError::account_not_found(destination));
            }
        }

        //NOTE: This is the only balance read that may drive the decision, it happened after every lock was held
        if request.transaction_type.debits_origin() {
            validate_sufficient(origin.balance, request.amount)
                .map_err(|error| LedgerError::from_balance(error, request))?;
        }

        stage.advance(Stage::Validated);

        let movements = apply_movements(request, &mut accounts)?;

        stage.advance(Stage::Applied);

        let touched: BTreeSet<&AccountNumber> = movements.iter().map(|movement| &movement.account_number).collect();

        for account_number in touched {
            let account = accounts.get(account_number)
                .ok_or_else(|| LedgerError::account_not_found(account_number))?;

            unit.update_balance(account_number, account.balance).await?;
        }

        let record = NewTransaction {
            transaction_type: request.transaction_type,
            amount: request.amount,
            timestamp: Utc::now(),
            origin_account_number: request.origin.clone(),
            destination_account_number: request.destination.clone()
        };

        let id = unit.insert_transaction(&record).await?;

        Ok(record.recorded(id))
    }
}

/// Takes the locks in key order, then reads each account through the unit of
/// work so the balances reflect everything committed before the locks.
async fn lock_accounts(
    locks: &dyn LockManager,
    unit: &mut dyn UnitOfWork,
    keys: &LockKeys
) -> Result<(LockSet, LockedAccounts), LedgerError> {
    let lock_set = locks.with_locks(keys).await;
    trace!("[{}] in-process lock(s) held for accounts [{keys}]", lock_set.len());
    let mut accounts = LockedAccounts::new();

    for key in keys.iter() {
        if let Some(account) = unit.fetch_locked(key).await? {
            accounts.insert(key.clone(), account);
        }
    }

    Ok((lock_set, accounts))
}

fn apply_movements(request: &TransactionRequest, accounts: &mut LockedAccounts) -> Result<Vec<Movement>, LedgerError> {
    let mut movements = Vec::with_capacity(2);

    let origin = accounts.get_mut(&request.origin)
        .ok_or_else(|| LedgerError::account_not_found(&request.origin))?;

    let outgoing = match request.transaction_type {
        TransactionType::Deposit => apply_deposit(origin, request.amount),
        TransactionType::Withdrawal => apply_withdrawal(origin, request.amount),
        TransactionType::Transfer => apply_transfer_out(origin, request.amount)
    }.map_err(|error| LedgerError::from_balance(error, request))?;

    origin.balance = outgoing.new_balance();
    movements.push(outgoing);

    if let (TransactionType::Transfer, Some(destination_number)) = (request.transaction_type, &request.destination) {
        let destination = accounts.get_mut(destination_number)
            .ok_or_else(|| LedgerError::account_not_found(destination_number))?;

        let incoming = apply_transfer_in(destination, request.amount)
            .map_err(|error| LedgerError::from_balance(error, request))?;

        destination.balance = incoming.new_balance();
        movements.push(incoming);
    }

    for movement in &movements {
        let direction = if movement.kind.is_debit() { "debited" } else { "credited" };
        trace!("Account [{}] {direction} [{}] by {:?}: [{}] -> [{}]", movement.account_number, movement.amount, movement.kind, movement.balance_before, movement.balance_after);
    }

    Ok(movements)
}
