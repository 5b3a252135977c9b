mod account_number;
mod errors;
mod monetary;

pub use account_number::AccountNumber;
pub use errors::{AccountNumberError, MonetaryError};
pub use monetary::Monetary;

pub type TransactionId = u64;
