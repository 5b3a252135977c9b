use thiserror::Error;

use crate::types::{AccountNumberError, MonetaryError};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Storage is closed")]
    Closed,
    #[error("Unit of work already finished")]
    Finished,
    #[error("Account [{0}] does not exist in storage")]
    MissingRow(String),
    #[error("Account [{0}] already exists in storage")]
    DuplicateRow(String),
    #[error("Stored balance is invalid: {0}")]
    InvalidBalance(#[from] MonetaryError),
    #[error("Stored account number is invalid: {0}")]
    InvalidAccountNumber(#[from] AccountNumberError),
    #[error("Stored transaction type [{0}] is unknown")]
    InvalidTransactionType(String),
    #[error("Storage backend does not lock rows, row lock mode needs one that does")]
    RowLocksUnavailable,
    #[error("Storage backend failure: {0}")]
    Backend(String)
}
