use std::time::Duration;

use crate::balance::BalanceError;
use crate::locks::LockKeys;
use crate::models::{TransactionRequest, TransactionType};
use crate::storage::PersistenceError;
use crate::types::{AccountNumber, Monetary};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Amount [{amount}] must not be negative for [{transaction_type:?}] on account [{account_number}]")]
    NegativeAmount {
        account_number: AccountNumber,
        transaction_type: TransactionType,
        amount: Monetary
    },
    #[error("Amount must be greater than zero for [{transaction_type:?}] on account [{account_number}]")]
    ZeroAmount {
        account_number: AccountNumber,
        transaction_type: TransactionType
    },
    #[error("Destination account is required for [Transfer] from account [{account_number}]")]
    MissingDestination {
        account_number: AccountNumber
    },
    #[error("Destination account is only allowed for transfers, got [{transaction_type:?}] on account [{account_number}]")]
    UnexpectedDestination {
        account_number: AccountNumber,
        transaction_type: TransactionType
    },
    #[error("Account [{account_number}] was not found")]
    AccountNotFound {
        account_number: AccountNumber
    },
    #[error("Insufficient balance [{balance}] for [{transaction_type:?}] of [{amount}] on account [{account_number}]")]
    InsufficientBalance {
        account_number: AccountNumber,
        transaction_type: TransactionType,
        balance: Monetary,
        amount: Monetary
    },
    #[error("Numeric overflow occurred for [{transaction_type:?}] on account [{account_number}]")]
    Overflow {
        account_number: AccountNumber,
        transaction_type: TransactionType
    },
    #[error("Timed out after [{waited:?}] waiting for locks on accounts [{accounts}]")]
    LockTimeout {
        accounts: String,
        waited: Duration
    },
    #[error("Persistence failure: {0}")]
    PersistenceFailure(#[from] PersistenceError)
}

impl LedgerError {
    pub fn negative_amount(request: &TransactionRequest) -> Self {
        Self::NegativeAmount {
            account_number: request.origin.clone(),
            transaction_type: request.transaction_type,
            amount: request.amount
        }
    }

    pub fn zero_amount(request: &TransactionRequest) -> Self {
        Self::ZeroAmount {
            account_number: request.origin.clone(),
            transaction_type: request.transaction_type
        }
    }

    pub fn missing_destination(request: &TransactionRequest) -> Self {
        Self::MissingDestination { account_number: request.origin.clone() }
    }

    pub fn unexpected_destination(request: &TransactionRequest) -> Self {
        Self::UnexpectedDestination {
            account_number: request.origin.clone(),
            transaction_type: request.transaction_type
        }
    }

    pub fn account_not_found(account_number: &AccountNumber) -> Self {
        Self::AccountNotFound { account_number: account_number.clone() }
    }

    pub fn lock_timeout(keys: &LockKeys, waited: Duration) -> Self {
        Self::LockTimeout {
            accounts: keys.to_string(),
            waited
        }
    }

    /// Attaches request context to a violation reported by the balance rules.
    pub fn from_balance(error: BalanceError, request: &TransactionRequest) -> Self {
        match error {
            BalanceError::NegativeAmount { .. } => Self::negative_amount(request),
            BalanceError::ZeroAmount => Self::zero_amount(request),
            BalanceError::InsufficientBalance { balance, amount } => Self::InsufficientBalance {
                account_number: request.origin.clone(),
                transaction_type: request.transaction_type,
                balance,
                amount
            },
            BalanceError::Overflow { account_number } => Self::Overflow {
                account_number,
                transaction_type: request.transaction_type
            }
        }
    }

    /// Stable identifier for the failure kind, used for reporting.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NegativeAmount { .. } => "negative_amount",
            Self::ZeroAmount { .. } => "zero_amount",
            Self::MissingDestination { .. } => "missing_destination",
            Self::UnexpectedDestination { .. } => "unexpected_destination",
            Self::AccountNotFound { .. } => "account_not_found",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::Overflow { .. } => "overflow",
            Self::LockTimeout { .. } => "lock_timeout",
            Self::PersistenceFailure(_) => "persistence_failure"
        }
    }

    /// True for failures a caller may resubmit unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }
}
