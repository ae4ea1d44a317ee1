//! The ledger store contract.
//!
//! Every mutating method is one atomic step against a single user record:
//! it either applies completely or leaves the record untouched. Callers
//! never read a balance, compute, and write it back themselves.

use async_trait::async_trait;
use wagerbook_types::{MatchId, Resolution, Result, Role, Score, User, UserId, Wager, WagerId};

/// Result of [`LedgerStore::mark_wager_resolved`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// This call moved the wager out of `Unresolved` and credited `credited`
    /// (zero for a loss), leaving the owner at `balance`.
    Applied { credited: u64, balance: u64 },
    /// An earlier call already resolved the wager; nothing was changed.
    AlreadyResolved(Resolution),
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open an account with an opening balance.
    ///
    /// # Errors
    /// `InvalidLogin`, `DuplicateUser`.
    async fn create_user(&self, login: &str, role: Role, opening_balance: u64) -> Result<User>;

    /// Snapshot of an account, wager history included.
    async fn get_user(&self, user_id: UserId) -> Result<User>;

    /// Conditionally add `delta` to the stored balance. Returns the new
    /// balance.
    ///
    /// # Errors
    /// `UserNotFound`, `InsufficientFunds` (result would be negative),
    /// `BalanceOverflow`.
    async fn atomic_adjust_balance(&self, user_id: UserId, delta: i64) -> Result<u64>;

    /// Debit `wager.amount` from `wager.user_id` and append the wager to the
    /// account's history, as one step. Returns the balance after the debit.
    ///
    /// # Errors
    /// `UserNotFound`, `InsufficientFunds`. On error neither the balance nor
    /// the history changes.
    async fn append_wager(&self, wager: Wager) -> Result<u64>;

    async fn get_wager(&self, wager_id: WagerId) -> Result<Wager>;

    /// All wagers on `match_id` still in `Unresolved`, in no particular order.
    async fn query_unresolved_wagers(&self, match_id: MatchId) -> Result<Vec<Wager>>;

    /// Resolve a wager to `outcome`, recording `score`, and credit its payout
    /// to the owner in the same step.
    ///
    /// Idempotent: a wager that is already terminal is reported as
    /// [`ResolveOutcome::AlreadyResolved`] and its owner is not credited
    /// again.
    ///
    /// # Errors
    /// `WagerNotFound`, `BalanceOverflow`, or a retryable store error.
    async fn mark_wager_resolved(
        &self,
        wager_id: WagerId,
        outcome: Resolution,
        score: Score,
    ) -> Result<ResolveOutcome>;
}
