use std::collections::BTreeSet;
use std::fmt;
use std::fmt::{Display, Formatter};

use crate::models::TransactionRequest;
use crate::types::AccountNumber;

/// Sorted, deduplicated account keys. The only shape a lock manager accepts.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LockKeys(Vec<AccountNumber>);

impl LockKeys {
    pub fn new<'a>(accounts: impl IntoIterator<Item = &'a AccountNumber>) -> Self {
        let ordered: BTreeSet<&AccountNumber> = accounts.into_iter().collect();
        Self(ordered.into_iter().cloned().collect())
    }

    pub fn for_request(request: &TransactionRequest) -> Self {
        Self::new(request.accounts())
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccountNumber> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Display for LockKeys {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        for (index, key) in self.0.iter().enumerate() {
            if index > 0 {
                formatter.write_str(",")?;
            }
            write!(formatter, "{key}")?;
        }

        Ok(())
    }
}
