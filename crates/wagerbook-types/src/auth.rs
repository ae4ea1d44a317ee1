//! Capability-based authorization.
//!
//! Credentials are verified upstream; the ledger receives an already
//! authenticated [`Principal`] and only asks whether that principal holds
//! a [`Capability`] for the operation at hand.

use serde::{Deserialize, Serialize};

use crate::{Result, Role, UserId, WagerbookError};

/// An authenticated caller as vouched for by the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    #[must_use]
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// Everything a caller can ask the ledger to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    PlaceWager,
    FinalizeMatch,
    SweepMatch,
    OpenAccount,
    AdjustBalance,
    ReadAccount(UserId),
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PlaceWager => write!(f, "place a wager"),
            Self::FinalizeMatch => write!(f, "finalize a match"),
            Self::SweepMatch => write!(f, "sweep a match"),
            Self::OpenAccount => write!(f, "open an account"),
            Self::AdjustBalance => write!(f, "adjust a balance"),
            Self::ReadAccount(user) => write!(f, "read account {user}"),
        }
    }
}

/// Decides whether a principal holds a capability.
pub trait Authorizer: Send + Sync {
    fn permits(&self, principal: &Principal, capability: Capability) -> bool;

    /// [`permits`](Self::permits) as a `Result`.
    fn authorize(&self, principal: &Principal, capability: Capability) -> Result<()> {
        if self.permits(principal, capability) {
            Ok(())
        } else {
            Err(WagerbookError::Forbidden {
                role: principal.role,
                action: capability.to_string(),
            })
        }
    }
}

/// Default policy: users bet and read their own account, admins do
/// everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleAuthorizer;

impl Authorizer for RoleAuthorizer {
    fn permits(&self, principal: &Principal, capability: Capability) -> bool {
        match principal.role {
            Role::Admin => true,
            Role::User => match capability {
                Capability::PlaceWager => true,
                Capability::ReadAccount(owner) => owner == principal.user_id,
                Capability::FinalizeMatch
                | Capability::SweepMatch
                | Capability::OpenAccount
                | Capability::AdjustBalance => false,
            },
        }
    }
}
