mod account;
mod errors;
mod request;
mod transaction;

use serde::Deserialize;

pub use account::Account;
pub use errors::LedgerError;
pub use request::TransactionRequest;
pub use transaction::{NewTransaction, Transaction};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Transfer => "transfer"
        }
    }

    /// Whether the origin account is debited and therefore needs a balance check.
    pub fn debits_origin(&self) -> bool {
        matches!(self, TransactionType::Withdrawal | TransactionType::Transfer)
    }
}
