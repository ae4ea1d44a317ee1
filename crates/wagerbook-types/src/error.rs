//! Error types for the Wagerbook ledger.
//!
//! All errors use the `WB_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by how the caller should react:
//! - 1xx: Validation errors (bad input, never retried)
//! - 2xx: Not-found errors (unknown match / user / wager)
//! - 3xx: Conflict errors (state does not permit the operation)
//! - 4xx: Authorization errors
//! - 9xx: Internal errors (store unavailable, retryable)

use thiserror::Error;

use crate::{MatchId, MatchStatus, UserId, WagerId};

/// Coarse classification of a [`WagerbookError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Forbidden,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "VALIDATION"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Forbidden => write!(f, "FORBIDDEN"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Central error enum for all Wagerbook operations.
#[derive(Debug, Error)]
pub enum WagerbookError {
    // =================================================================
    // Validation Errors (1xx)
    // =================================================================
    /// Amount is zero, negative, fractional or out of range.
    #[error("WB_ERR_100: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Selection is neither team of the match nor the draw sentinel.
    #[error("WB_ERR_101: Invalid selection {selection:?} for {match_id}")]
    InvalidSelection { match_id: MatchId, selection: String },

    /// Date is not `YYYY-MM-DD`.
    #[error("WB_ERR_102: Malformed date {0:?}, expected YYYY-MM-DD")]
    MalformedDate(String),

    /// Team names are empty, identical, or collide with the draw sentinel.
    #[error("WB_ERR_103: Invalid teams: {reason}")]
    InvalidTeams { reason: String },

    /// Login is too short or otherwise unusable.
    #[error("WB_ERR_104: Invalid login: {reason}")]
    InvalidLogin { reason: String },

    // =================================================================
    // Not-Found Errors (2xx)
    // =================================================================
    #[error("WB_ERR_200: Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("WB_ERR_201: User not found: {0}")]
    UserNotFound(UserId),

    #[error("WB_ERR_202: Wager not found: {0}")]
    WagerNotFound(WagerId),

    // =================================================================
    // Conflict Errors (3xx)
    // =================================================================
    /// The balance cannot cover the requested debit.
    #[error("WB_ERR_300: Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    /// Wagers are only accepted while the match is open.
    #[error("WB_ERR_301: Match {match_id} is {status}, not accepting wagers")]
    MatchClosed { match_id: MatchId, status: MatchStatus },

    /// The match has already made its single open → finished transition.
    #[error("WB_ERR_302: Match already finalized: {0}")]
    AlreadyFinalized(MatchId),

    /// Settlement was requested for a match that is still open.
    #[error("WB_ERR_303: Match not finished: {0}")]
    MatchNotFinished(MatchId),

    /// The wager has already left the unresolved state.
    #[error("WB_ERR_304: Wager already resolved: {0}")]
    AlreadyResolved(WagerId),

    /// A login is already taken.
    #[error("WB_ERR_305: User already exists: {0}")]
    DuplicateUser(String),

    /// A credit would overflow the balance register.
    #[error("WB_ERR_306: Balance overflow for {0}")]
    BalanceOverflow(UserId),

    // =================================================================
    // Authorization Errors (4xx)
    // =================================================================
    #[error("WB_ERR_400: Forbidden: {role} may not {action}")]
    Forbidden { role: crate::Role, action: String },

    // =================================================================
    // Internal (9xx)
    // =================================================================
    /// The backing store could not complete the operation. Retryable.
    #[error("WB_ERR_900: Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Ledger accounting no longer adds up. Critical.
    #[error("WB_ERR_901: Ledger invariant violation: {reason}")]
    LedgerInvariantViolation { reason: String },

    #[error("WB_ERR_902: Internal error: {0}")]
    Internal(String),

    #[error("WB_ERR_903: Serialization error: {0}")]
    Serialization(String),

    #[error("WB_ERR_904: Configuration error: {0}")]
    Configuration(String),

    #[error("WB_ERR_905: I/O error: {0}")]
    Io(String),
}

impl WagerbookError {
    /// Which bucket of the error taxonomy this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount { .. }
            | Self::InvalidSelection { .. }
            | Self::MalformedDate(_)
            | Self::InvalidTeams { .. }
            | Self::InvalidLogin { .. }
            | Self::Configuration(_) => ErrorKind::Validation,
            Self::MatchNotFound(_) | Self::UserNotFound(_) | Self::WagerNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::InsufficientFunds { .. }
            | Self::MatchClosed { .. }
            | Self::AlreadyFinalized(_)
            | Self::MatchNotFinished(_)
            | Self::AlreadyResolved(_)
            | Self::DuplicateUser(_)
            | Self::BalanceOverflow(_) => ErrorKind::Conflict,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::StoreUnavailable(_)
            | Self::LedgerInvariantViolation { .. }
            | Self::Internal(_)
            | Self::Serialization(_)
            | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Only transient store failures are worth retrying; everything else
    /// would fail identically on a second attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::Io(_))
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, WagerbookError>;

impl From<std::io::Error> for WagerbookError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for WagerbookError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = WagerbookError::MatchNotFound(MatchId::new());
        let msg = format!("{err}");
        assert!(msg.starts_with("WB_ERR_200"), "Got: {msg}");
    }

    #[test]
    fn insufficient_funds_display() {
        let err = WagerbookError::InsufficientFunds {
            needed: 60,
            available: 40,
        };
        let msg = format!("{err}");
        assert!(msg.contains("WB_ERR_300"));
        assert!(msg.contains("60"));
        assert!(msg.contains("40"));
    }

    #[test]
    fn kinds_follow_code_groups() {
        assert_eq!(
            WagerbookError::InvalidAmount { reason: "zero".into() }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            WagerbookError::UserNotFound(UserId::new()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            WagerbookError::AlreadyFinalized(MatchId::new()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            WagerbookError::StoreUnavailable("down".into()).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn only_store_failures_are_retryable() {
        assert!(WagerbookError::StoreUnavailable("timeout".into()).is_retryable());
        assert!(!WagerbookError::AlreadyFinalized(MatchId::new()).is_retryable());
        assert!(
            !WagerbookError::InsufficientFunds {
                needed: 1,
                available: 0
            }
            .is_retryable()
        );
        assert!(
            !WagerbookError::LedgerInvariantViolation {
                reason: "x".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn all_errors_have_wb_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(WagerbookError::MalformedDate("13-09-2013".into())),
            Box::new(WagerbookError::WagerNotFound(WagerId::new())),
            Box::new(WagerbookError::MatchClosed {
                match_id: MatchId::new(),
                status: MatchStatus::Finished,
            }),
            Box::new(WagerbookError::Forbidden {
                role: crate::Role::User,
                action: "finalize a match".into(),
            }),
            Box::new(WagerbookError::Internal("test".into())),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("WB_ERR_"),
                "Error missing WB_ERR_ prefix: {msg}"
            );
        }
    }
}
