use crate::types::{AccountNumber, Monetary};

/// Balance state of a single account.
///
/// This is the persistence agnostic record; storage adapters map their own
/// row types into it. Only the ledger processor produces new balances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// The unique account number, also the lock key.
    pub account_number: AccountNumber,
    /// Current balance, never negative once committed.
    pub balance: Monetary,
    /// Opaque reference to the owning client.
    pub owner_ref: String
}

impl Account {
    pub fn new(account_number: AccountNumber, balance: Monetary, owner_ref: impl Into<String>) -> Self {
        Self {
            account_number,
            balance,
            owner_ref: owner_ref.into()
        }
    }
}
