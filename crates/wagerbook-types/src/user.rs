//! Ledger accounts.
//!
//! A user's balance is touched from three places only: administrative
//! funding adjustments, wager placement (debit) and settlement (credit).
//! Because the wager list is append-only, the balance can always be
//! re-derived from `net_funding` and the wager history; see
//! [`User::reconcile`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MIN_LOGIN_LENGTH;
use crate::{Result, UserId, Wager, WagerId, WagerbookError};

/// Closed set of account roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub login: String,
    pub role: Role,
    /// Spendable balance in minor units.
    pub balance: u64,
    /// Signed sum of all administrative adjustments, opening balance included.
    pub net_funding: i64,
    /// Placement order.
    pub wagers: Vec<Wager>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(login: &str, role: Role, opening_balance: u64) -> Result<Self> {
        validate_login(login)?;
        let net_funding = i64::try_from(opening_balance).map_err(|_| {
            WagerbookError::InvalidAmount {
                reason: format!("opening balance {opening_balance} out of range"),
            }
        })?;
        Ok(Self {
            id: UserId::new(),
            login: login.to_string(),
            role,
            balance: opening_balance,
            net_funding,
            wagers: Vec::new(),
            created_at: Utc::now(),
        })
    }

    #[must_use]
    pub fn wager(&self, wager_id: WagerId) -> Option<&Wager> {
        self.wagers.iter().find(|w| w.id == wager_id)
    }

    pub fn wager_mut(&mut self, wager_id: WagerId) -> Option<&mut Wager> {
        self.wagers.iter_mut().find(|w| w.id == wager_id)
    }

    /// Sum of all stakes ever debited.
    #[must_use]
    pub fn total_staked(&self) -> u128 {
        self.wagers.iter().map(|w| u128::from(w.amount.get())).sum()
    }

    /// Sum of all settlement credits ever applied.
    #[must_use]
    pub fn total_paid_out(&self) -> u128 {
        self.wagers.iter().map(|w| u128::from(w.payout)).sum()
    }

    /// Stakes still awaiting settlement.
    #[must_use]
    pub fn open_exposure(&self) -> u64 {
        self.wagers
            .iter()
            .filter(|w| w.is_unresolved())
            .map(|w| w.amount.get())
            .sum()
    }

    /// Check `balance == net_funding − Σ stakes + Σ payouts`.
    ///
    /// # Errors
    /// Returns [`WagerbookError::LedgerInvariantViolation`] on mismatch.
    pub fn reconcile(&self) -> Result<()> {
        // Stake and payout sums are bounded by wager count * MAX_WAGER_AMOUNT,
        // far below i128::MAX.
        let staked = i128::try_from(self.total_staked()).unwrap_or(i128::MAX);
        let paid = i128::try_from(self.total_paid_out()).unwrap_or(i128::MAX);
        let expected = i128::from(self.net_funding) - staked + paid;
        if expected != i128::from(self.balance) {
            return Err(WagerbookError::LedgerInvariantViolation {
                reason: format!(
                    "user {}: balance {} != expected {expected} (funding={}, staked={}, paid={})",
                    self.id,
                    self.balance,
                    self.net_funding,
                    self.total_staked(),
                    self.total_paid_out(),
                ),
            });
        }
        Ok(())
    }
}

pub fn validate_login(login: &str) -> Result<()> {
    if login.chars().count() < MIN_LOGIN_LENGTH {
        return Err(WagerbookError::InvalidLogin {
            reason: format!("login should have at least {MIN_LOGIN_LENGTH} characters"),
        });
    }
    if login.chars().any(char::is_whitespace) {
        return Err(WagerbookError::InvalidLogin {
            reason: "login must not contain whitespace".into(),
        });
    }
    Ok(())
}
