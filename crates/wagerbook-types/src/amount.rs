//! Stake amounts in currency minor units.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_WAGER_AMOUNT, PAYOUT_MULTIPLIER};
use crate::{Result, WagerbookError};

/// A strictly positive stake, bounded by [`MAX_WAGER_AMOUNT`] so that the
/// even-money payout always fits in a `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Amount(u64);

impl Amount {
    /// Validate a signed amount as supplied by a caller.
    pub fn new(raw: i64) -> Result<Self> {
        if raw <= 0 {
            return Err(WagerbookError::InvalidAmount {
                reason: format!("{raw} is not positive"),
            });
        }
        Self::try_from(raw.unsigned_abs())
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    /// Credit owed to a winning wager: the stake returned plus an equal win.
    #[must_use]
    pub fn payout(self) -> u64 {
        // Cannot overflow: MAX_WAGER_AMOUNT * PAYOUT_MULTIPLIER < u64::MAX.
        self.0 * PAYOUT_MULTIPLIER
    }
}

impl TryFrom<u64> for Amount {
    type Error = WagerbookError;

    fn try_from(value: u64) -> Result<Self> {
        if value == 0 {
            return Err(WagerbookError::InvalidAmount {
                reason: "0 is not positive".into(),
            });
        }
        if value > MAX_WAGER_AMOUNT {
            return Err(WagerbookError::InvalidAmount {
                reason: format!("{value} exceeds maximum {MAX_WAGER_AMOUNT}"),
            });
        }
        Ok(Self(value))
    }
}

impl From<Amount> for u64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Parses base-10 integers only. `"50.0"`, `"1e3"`, `"+5"` and `" 5"` are
/// all rejected.
impl FromStr for Amount {
    type Err = WagerbookError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(WagerbookError::InvalidAmount {
                reason: format!("{s:?} is not a base-10 positive integer"),
            });
        }
        let value: u64 = s.parse().map_err(|_| WagerbookError::InvalidAmount {
            reason: format!("{s:?} is out of range"),
        })?;
        Self::try_from(value)
    }
}

/// An amount as a caller sent it: a JSON number or a decimal string.
/// Nothing is validated until [`RawAmount::to_amount`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Integer(i64),
    Unsigned(u64),
    Fractional(f64),
    Text(String),
}

impl RawAmount {
    /// Validate into a stake. Any fractional number is `InvalidAmount`,
    /// `50.0` included, the same as the string `"50.0"`.
    pub fn to_amount(&self) -> Result<Amount> {
        match self {
            Self::Integer(raw) => Amount::new(*raw),
            Self::Unsigned(raw) => Amount::try_from(*raw),
            Self::Fractional(raw) => Err(WagerbookError::InvalidAmount {
                reason: format!("{raw:?} is not an integer"),
            }),
            Self::Text(raw) => raw.parse(),
        }
    }
}

impl From<i64> for RawAmount {
    fn from(raw: i64) -> Self {
        Self::Integer(raw)
    }
}

impl From<&str> for RawAmount {
    fn from(raw: &str) -> Self {
        Self::Text(raw.to_owned())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
