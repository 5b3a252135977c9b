mod errors;
mod memory_store;
mod rows;

use async_trait::async_trait;

use crate::models::{Account, NewTransaction};
use crate::types::{AccountNumber, Monetary, TransactionId};

pub use errors::PersistenceError;
pub use memory_store::MemoryStore;
pub use rows::{AccountRow, TransactionRow};

/// Entry point to a storage backend.
#[async_trait]
pub trait Gateway: Send + Sync + 'static {
    /// Opens a unit of work. Nothing it stages is visible before `commit`.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, PersistenceError>;

    /// Committed read outside any unit of work. May be stale by the time it
    /// returns and must not drive balance decisions.
    //NOTE: Nothing in the CLI reads outside a unit of work, the port keeps it for other callers
    #[allow(dead_code)]
    async fn fetch(&self, account_number: &AccountNumber) -> Result<Option<Account>, PersistenceError>;

    /// Whether `fetch_locked` takes an exclusive row lock held until the unit of work ends.
    fn locks_rows(&self) -> bool;
}

/// One atomic scope of reads and writes against the backend.
///
/// Dropping a unit of work without calling `commit` discards everything it
/// staged and releases any row locks it holds.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Reads an account and holds its row lock until the unit of work ends,
    /// on backends that lock rows.
    async fn fetch_locked(&mut self, account_number: &AccountNumber) -> Result<Option<Account>, PersistenceError>;

    //NOTE: The processor only reads through `fetch_locked`, unlocked reads stay part of the port
    #[allow(dead_code)]
    async fn fetch(&mut self, account_number: &AccountNumber) -> Result<Option<Account>, PersistenceError>;

    async fn update_balance(&mut self, account_number: &AccountNumber, new_balance: Monetary) -> Result<(), PersistenceError>;

    async fn insert_transaction(&mut self, transaction: &NewTransaction) -> Result<TransactionId, PersistenceError>;

    async fn commit(&mut self) -> Result<(), PersistenceError>;

    async fn rollback(&mut self) -> Result<(), PersistenceError>;
}
