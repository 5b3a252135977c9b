use std::num::ParseIntError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonetaryError {
    #[error("Monetary error: {0}")]
    InvalidFormat(String),
    #[error("Monetary error: {0}")]
    ParseInt(#[from] ParseIntError),
    #[error("Monetary error: Overflow")]
    Overflow
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountNumberError {
    #[error("Account number [{0}] must be at least 3 digits long")]
    TooShort(String),
    #[error("Account number [{0}] must contain only digits")]
    NonDigit(String)
}
