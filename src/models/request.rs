use serde::Deserialize;

use crate::models::errors::LedgerError;
use crate::models::TransactionType;
use crate::types::{AccountNumber, Monetary};

/// A request to move money, as read from the input CSV.
///
/// The `destination` column is empty for deposits and withdrawals.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRequest {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub origin: AccountNumber,
    pub destination: Option<AccountNumber>,
    pub amount: Monetary
}

impl TransactionRequest {
    /// Checks that a destination is present exactly when the type needs one.
    pub fn check_shape(&self) -> Result<(), LedgerError> {
        match (self.transaction_type, &self.destination) {
            (TransactionType::Transfer, None) => Err(LedgerError::missing_destination(self)),
            (TransactionType::Deposit | TransactionType::Withdrawal, Some(_)) => Err(LedgerError::unexpected_destination(self)),
            _ => Ok(())
        }
    }

    /// Every account the request touches, origin first.
    pub fn accounts(&self) -> impl Iterator<Item = &AccountNumber> {
        std::iter::once(&self.origin).chain(self.destination.iter())
    }
}

//NOTE: Requests reach the binary through CSV, these builders serve the tests
#[cfg(test)]
impl TransactionRequest {
    pub fn deposit(origin: AccountNumber, amount: Monetary) -> Self {
        Self { transaction_type: TransactionType::Deposit, origin, destination: None, amount }
    }

    pub fn withdrawal(origin: AccountNumber, amount: Monetary) -> Self {
        Self { transaction_type: TransactionType::Withdrawal, origin, destination: None, amount }
    }

    pub fn transfer(origin: AccountNumber, destination: AccountNumber, amount: Monetary) -> Self {
        Self { transaction_type: TransactionType::Transfer, origin, destination: Some(destination), amount }
    }
}
