use crate::types::errors::MonetaryError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const DECIMAL_PLACES: usize = 2;
const SCALE: i64 = 10i64.pow(DECIMAL_PLACES as u32);

/// Fixed-point amount with two fractional digits, stored as whole cents.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Monetary(i64);

impl Monetary {
    pub const ZERO: Monetary = Monetary(0);

    pub const fn from_cents(cents: i64) -> Self {
        Monetary(cents)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Monetary) -> Option<Monetary> {
        self.0.checked_add(rhs.0).map(Monetary)
    }

    pub fn checked_sub(self, rhs: Monetary) -> Option<Monetary> {
        self.0.checked_sub(rhs.0).map(Monetary)
    }
}

impl Display for Monetary {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = SCALE.unsigned_abs();
        let integer = abs / scale;
        let fraction = abs % scale;
        write!(formatter, "{}{}.{:0width$}", sign, integer, fraction, width = DECIMAL_PLACES)
    }
}

impl FromStr for Monetary {
    type Err = MonetaryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();

        if value.is_empty() {
            return Err(MonetaryError::InvalidFormat("Value is an empty string".to_string()));
        }

        let (integer_part, fraction_part) = match value.split_once('.') {
            Some((integer, fraction)) => (integer, Some(fraction)),
            None => (value, None)
        };

        if fraction_part.is_some_and(|fraction| fraction.contains('.')) {
            return Err(MonetaryError::InvalidFormat("Value has more than one decimal point".to_string()));
        }

        let integer: i64 = integer_part.parse().map_err(|error| {
            MonetaryError::InvalidFormat(format!("Value has an invalid integer part: {:?}", error))
        })?;

        let fraction: i64 = match fraction_part {
            Some(fraction) if !fraction.is_empty() => {
                if fraction.len() > DECIMAL_PLACES {
                    return Err(MonetaryError::InvalidFormat("Value has too many decimal places".to_string()));
                }

                if !fraction.bytes().all(|byte| byte.is_ascii_digit()) {
                    return Err(MonetaryError::InvalidFormat(format!("Value has an invalid fraction part: {fraction}")));
                }

                format!("{:0<width$}", fraction, width = DECIMAL_PLACES).parse()?
            }
            _ => 0
        };

        let sign = if integer_part.starts_with('-') { -1 } else { 1 };
        let result = integer.checked_mul(SCALE)
            .and_then(|v| v.checked_add(sign * fraction))
            .ok_or(MonetaryError::Overflow)?;

        Ok(Monetary(result))
    }
}

impl<'de> Deserialize<'de> for Monetary {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Monetary::from_str(&value).map_err(de::Error::custom)
    }
}

impl From<Monetary> for Decimal {
    fn from(value: Monetary) -> Self {
        Decimal::new(value.0, DECIMAL_PLACES as u32)
    }
}

impl TryFrom<Decimal> for Monetary {
    type Error = MonetaryError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        let cents = value.checked_mul(Decimal::from(SCALE))
            .ok_or(MonetaryError::Overflow)?;

        if !cents.fract().is_zero() {
            return Err(MonetaryError::InvalidFormat(format!("Value [{value}] has too many decimal places")));
        }

        cents.to_i64()
            .map(Monetary)
            .ok_or(MonetaryError::Overflow)
    }
}
