use crate::types::errors::AccountNumberError;
use serde::Deserialize;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const MIN_LENGTH: usize = 3;

/// Natural key of an account, also used as its lock key.
///
/// Ordering is lexicographic on the digit string, which is the global
/// lock order every operation sorts by before acquiring anything.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = AccountNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let value = value.trim().to_string();

        if value.len() < MIN_LENGTH {
            return Err(AccountNumberError::TooShort(value));
        }

        if !value.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(AccountNumberError::NonDigit(value));
        }

        Ok(AccountNumber(value))
    }
}

impl FromStr for AccountNumber {
    type Err = AccountNumberError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        AccountNumber::try_from(value.to_string())
    }
}

impl Display for AccountNumber {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}
