use chrono::{DateTime, Utc};

use crate::models::TransactionType;
use crate::types::{AccountNumber, Monetary, TransactionId};

/// A fully formed ledger entry that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub transaction_type: TransactionType,
    pub amount: Monetary,
    pub timestamp: DateTime<Utc>,
    pub origin_account_number: AccountNumber,
    /// Present only for transfers.
    pub destination_account_number: Option<AccountNumber>
}

impl NewTransaction {
    /// Attaches the identifier handed out by the persistence gateway.
    pub fn recorded(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            transaction_type: self.transaction_type,
            amount: self.amount,
            timestamp: self.timestamp,
            origin_account_number: self.origin_account_number,
            destination_account_number: self.destination_account_number
        }
    }
}

/// An immutable, persisted ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: TransactionId,
    pub transaction_type: TransactionType,
    pub amount: Monetary,
    pub timestamp: DateTime<Utc>,
    pub origin_account_number: AccountNumber,
    pub destination_account_number: Option<AccountNumber>
}
