use crate::types::{AccountNumber, Monetary};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BalanceError {
    #[error("Amount [{amount}] is negative")]
    NegativeAmount {
        amount: Monetary
    },
    #[error("Amount is zero")]
    ZeroAmount,
    #[error("Balance [{balance}] does not cover [{amount}]")]
    InsufficientBalance {
        balance: Monetary,
        amount: Monetary
    },
    #[error("Balance of account [{account_number}] overflowed")]
    Overflow {
        account_number: AccountNumber
    }
}
