//! Balance arithmetic shared by every store implementation.
//!
//! Stores must evaluate these against the value they currently hold for
//! the user, inside the same critical section (or conditional update) that
//! writes the result back. A failed check leaves the stored balance as it
//! was.

use wagerbook_types::{Result, UserId, WagerbookError};

/// Apply a signed adjustment to `current`.
///
/// # Errors
/// - `InsufficientFunds` if the result would be negative
/// - `BalanceOverflow` if the result would not fit in a `u64`
pub fn apply_delta(user_id: UserId, current: u64, delta: i64) -> Result<u64> {
    if delta < 0 {
        checked_debit(current, delta.unsigned_abs())
    } else {
        checked_credit(user_id, current, delta.unsigned_abs())
    }
}

/// `current - amount`, refusing to go below zero.
pub fn checked_debit(current: u64, amount: u64) -> Result<u64> {
    current
        .checked_sub(amount)
        .ok_or(WagerbookError::InsufficientFunds {
            needed: amount,
            available: current,
        })
}

/// `current + amount`, refusing to wrap.
pub fn checked_credit(user_id: UserId, current: u64, amount: u64) -> Result<u64> {
    current
        .checked_add(amount)
        .ok_or(WagerbookError::BalanceOverflow(user_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_within_balance() {
        assert_eq!(checked_debit(100, 100).unwrap(), 0);
        assert_eq!(checked_debit(100, 60).unwrap(), 40);
    }

    #[test]
    fn debit_beyond_balance_fails() {
        let err = checked_debit(40, 60).unwrap_err();
        assert!(matches!(
            err,
            WagerbookError::InsufficientFunds {
                needed: 60,
                available: 40
            }
        ));
    }

    #[test]
    fn delta_sign_selects_direction() {
        let user = UserId::new();
        assert_eq!(apply_delta(user, 10, 5).unwrap(), 15);
        assert_eq!(apply_delta(user, 10, -10).unwrap(), 0);
        assert_eq!(apply_delta(user, 10, 0).unwrap(), 10);
        assert!(apply_delta(user, 10, -11).is_err());
    }

    #[test]
    fn extreme_deltas() {
        let user = UserId::new();
        let err = apply_delta(user, u64::MAX, 1).unwrap_err();
        assert!(matches!(err, WagerbookError::BalanceOverflow(id) if id == user));
        assert!(apply_delta(user, 0, i64::MIN).is_err());
        assert_eq!(
            apply_delta(user, i64::MIN.unsigned_abs(), i64::MIN).unwrap(),
            0
        );
    }
}
