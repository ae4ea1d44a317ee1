//! Fault-injecting ledger for tests. **Never use in production.**
//!
//! Wraps an [`InMemoryLedger`] and fails selected calls with
//! [`WagerbookError::StoreUnavailable`], either before the call reaches
//! the store (request lost) or after it has been applied (reply lost).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use wagerbook_types::{
    MatchId, Resolution, Result, Role, Score, User, UserId, Wager, WagerId, WagerbookError,
};

use crate::ledger::{LedgerStore, ResolveOutcome};
use crate::memory_ledger::InMemoryLedger;

#[derive(Default)]
struct Faults {
    /// Resolutions of this user's wagers fail before being applied.
    resolve_before: HashMap<UserId, usize>,
    /// Resolutions of this user's wagers are applied, then reported failed.
    resolve_after: HashMap<UserId, usize>,
    /// Appends fail before being applied.
    append_before: usize,
    /// Unresolved-wager listings fail.
    query: usize,
    /// Reads of this user's account fail.
    read_user: HashMap<UserId, usize>,
}

fn take(budget: &mut usize) -> bool {
    if *budget == 0 {
        false
    } else {
        *budget -= 1;
        true
    }
}

pub struct FlakyLedger {
    inner: Arc<InMemoryLedger>,
    faults: Mutex<Faults>,
    resolve_calls: AtomicUsize,
}

impl FlakyLedger {
    #[must_use]
    pub fn new(inner: Arc<InMemoryLedger>) -> Self {
        Self {
            inner,
            faults: Mutex::new(Faults::default()),
            resolve_calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn inner(&self) -> &Arc<InMemoryLedger> {
        &self.inner
    }

    /// Fail the next `times` resolutions of `user`'s wagers without applying them.
    pub fn fail_resolves_for(&self, user: UserId, times: usize) {
        *self.faults.lock().resolve_before.entry(user).or_default() += times;
    }

    /// Apply the next `times` resolutions of `user`'s wagers but report failure.
    pub fn lose_resolve_replies_for(&self, user: UserId, times: usize) {
        *self.faults.lock().resolve_after.entry(user).or_default() += times;
    }

    /// Fail the next `times` appends without applying them.
    pub fn fail_appends(&self, times: usize) {
        self.faults.lock().append_before += times;
    }

    /// Fail the next `times` unresolved-wager listings.
    pub fn fail_queries(&self, times: usize) {
        self.faults.lock().query += times;
    }

    /// Fail the next `times` reads of `user`'s account.
    pub fn fail_reads_for(&self, user: UserId, times: usize) {
        *self.faults.lock().read_user.entry(user).or_default() += times;
    }

    /// Total `mark_wager_resolved` calls seen, failed ones included.
    #[must_use]
    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    fn unavailable(what: &str) -> WagerbookError {
        WagerbookError::StoreUnavailable(format!("injected fault: {what}"))
    }
}

#[async_trait]
impl LedgerStore for FlakyLedger {
    async fn create_user(&self, login: &str, role: Role, opening_balance: u64) -> Result<User> {
        self.inner.create_user(login, role, opening_balance).await
    }

    async fn get_user(&self, user_id: UserId) -> Result<User> {
        let fail = self.faults.lock().read_user.get_mut(&user_id).is_some_and(take);
        if fail {
            return Err(Self::unavailable("account read"));
        }
        self.inner.get_user(user_id).await
    }

    async fn atomic_adjust_balance(&self, user_id: UserId, delta: i64) -> Result<u64> {
        self.inner.atomic_adjust_balance(user_id, delta).await
    }

    async fn append_wager(&self, wager: Wager) -> Result<u64> {
        let fail_before = take(&mut self.faults.lock().append_before);
        if fail_before {
            return Err(Self::unavailable("append before apply"));
        }
        self.inner.append_wager(wager).await
    }

    async fn get_wager(&self, wager_id: WagerId) -> Result<Wager> {
        self.inner.get_wager(wager_id).await
    }

    async fn query_unresolved_wagers(&self, match_id: MatchId) -> Result<Vec<Wager>> {
        let fail = take(&mut self.faults.lock().query);
        if fail {
            return Err(Self::unavailable("unresolved wager listing"));
        }
        self.inner.query_unresolved_wagers(match_id).await
    }

    async fn mark_wager_resolved(
        &self,
        wager_id: WagerId,
        outcome: Resolution,
        score: Score,
    ) -> Result<ResolveOutcome> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let owner = self.inner.get_wager(wager_id).await?.user_id;

        let fail_before = {
            let mut faults = self.faults.lock();
            faults.resolve_before.get_mut(&owner).is_some_and(take)
        };
        if fail_before {
            return Err(Self::unavailable("resolve before apply"));
        }

        let applied = self.inner.mark_wager_resolved(wager_id, outcome, score).await?;

        let fail_after = {
            let mut faults = self.faults.lock();
            faults.resolve_after.get_mut(&owner).is_some_and(take)
        };
        if fail_after {
            return Err(Self::unavailable("resolve reply lost"));
        }
        Ok(applied)
    }
}
