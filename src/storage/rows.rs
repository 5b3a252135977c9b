use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::{Account, NewTransaction, Transaction, TransactionType};
use crate::storage::PersistenceError;
use crate::types::{AccountNumber, Monetary, TransactionId};

/// Storage-side shape of an account, as a SQL table would hold it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRow {
    pub account_number: String,
    pub balance: Decimal,
    pub owner_ref: String
}

impl AccountRow {
    pub fn from_domain(account: &Account) -> Self {
        Self {
            account_number: account.account_number.to_string(),
            balance: Decimal::from(account.balance),
            owner_ref: account.owner_ref.clone()
        }
    }

    pub fn to_domain(&self) -> Result<Account, PersistenceError> {
        Ok(Account {
            account_number: AccountNumber::try_from(self.account_number.clone())?,
            balance: Monetary::try_from(self.balance)?,
            owner_ref: self.owner_ref.clone()
        })
    }
}

/// Storage-side shape of a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRow {
    pub id: TransactionId,
    pub kind: String,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub origin_account_number: String,
    pub destination_account_number: Option<String>
}

impl TransactionRow {
    pub fn from_new(id: TransactionId, transaction: &NewTransaction) -> Self {
        Self {
            id,
            kind: transaction.transaction_type.as_str().to_string(),
            amount: Decimal::from(transaction.amount),
            created_at: transaction.timestamp,
            origin_account_number: transaction.origin_account_number.to_string(),
            destination_account_number: transaction.destination_account_number.as_ref().map(ToString::to_string)
        }
    }

    pub fn to_domain(&self) -> Result<Transaction, PersistenceError> {
        let transaction_type = match self.kind.as_str() {
            "deposit" => TransactionType::Deposit,
            "withdrawal" => TransactionType::Withdrawal,
            "transfer" => TransactionType::Transfer,
            other => return Err(PersistenceError::InvalidTransactionType(other.to_string()))
        };

        let destination_account_number = match &self.destination_account_number {
            Some(number) => Some(AccountNumber::try_from(number.clone())?),
            None => None
        };

        Ok(Transaction {
            id: self.id,
            transaction_type,
            amount: Monetary::try_from(self.amount)?,
            timestamp: self.created_at,
            origin_account_number: AccountNumber::try_from(self.origin_account_number.clone())?,
            destination_account_number
        })
    }
}
