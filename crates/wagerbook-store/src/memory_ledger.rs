//! In-memory [`LedgerStore`].
//!
//! Each account lives behind its own mutex, so mutations of one user are
//! serialized while different users proceed in parallel. Lock order is
//! always account → index (`owners`, `unresolved`); the directory lock is
//! only held long enough to clone an account handle.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use wagerbook_types::{
    MatchId, Resolution, Result, Role, Score, User, UserId, Wager, WagerId, WagerbookError,
};

use crate::balance;
use crate::ledger::{LedgerStore, ResolveOutcome};

type Account = Arc<Mutex<User>>;

#[derive(Default)]
struct Directory {
    accounts: HashMap<UserId, Account>,
    logins: HashMap<String, UserId>,
}

/// Process-local ledger. The reference store for tests and the CLI.
#[derive(Default)]
pub struct InMemoryLedger {
    directory: RwLock<Directory>,
    /// Which account holds each wager.
    owners: RwLock<HashMap<WagerId, UserId>>,
    /// Unresolved wagers per match.
    unresolved: Mutex<HashMap<MatchId, BTreeSet<WagerId>>>,
}

impl InMemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every account id, in creation order.
    #[must_use]
    pub fn user_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.directory.read().accounts.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Sum of all balances. Used by audits.
    #[must_use]
    pub fn total_balance(&self) -> u128 {
        let accounts: Vec<Account> = self.directory.read().accounts.values().cloned().collect();
        accounts
            .iter()
            .map(|account| u128::from(account.lock().balance))
            .sum()
    }

    fn account(&self, user_id: UserId) -> Result<Account> {
        self.directory
            .read()
            .accounts
            .get(&user_id)
            .cloned()
            .ok_or(WagerbookError::UserNotFound(user_id))
    }

    fn owner_account(&self, wager_id: WagerId) -> Result<Account> {
        let owner = self
            .owners
            .read()
            .get(&wager_id)
            .copied()
            .ok_or(WagerbookError::WagerNotFound(wager_id))?;
        self.account(owner)
    }

    fn create_user_sync(&self, login: &str, role: Role, opening_balance: u64) -> Result<User> {
        let user = User::new(login, role, opening_balance)?;
        let mut directory = self.directory.write();
        if directory.logins.contains_key(login) {
            return Err(WagerbookError::DuplicateUser(login.to_string()));
        }
        directory.logins.insert(user.login.clone(), user.id);
        directory
            .accounts
            .insert(user.id, Arc::new(Mutex::new(user.clone())));
        Ok(user)
    }

    fn adjust_balance_sync(&self, user_id: UserId, delta: i64) -> Result<u64> {
        let account = self.account(user_id)?;
        let mut user = account.lock();
        let balance = balance::apply_delta(user_id, user.balance, delta)?;
        let net_funding = user.net_funding.checked_add(delta).ok_or_else(|| {
            WagerbookError::Internal(format!("net funding overflow for {user_id}"))
        })?;
        user.balance = balance;
        user.net_funding = net_funding;
        Ok(balance)
    }

    fn append_wager_sync(&self, wager: Wager) -> Result<u64> {
        let account = self.account(wager.user_id)?;
        let mut user = account.lock();
        let balance = balance::checked_debit(user.balance, wager.amount.get())?;

        // Indexes first: they cannot fail, and the account lock keeps the
        // wager invisible to resolution until it is pushed below.
        self.owners.write().insert(wager.id, wager.user_id);
        self.unresolved
            .lock()
            .entry(wager.match_id)
            .or_default()
            .insert(wager.id);

        user.balance = balance;
        user.wagers.push(wager);
        Ok(balance)
    }

    fn get_wager_sync(&self, wager_id: WagerId) -> Result<Wager> {
        let account = self.owner_account(wager_id)?;
        let user = account.lock();
        user.wager(wager_id)
            .cloned()
            .ok_or(WagerbookError::WagerNotFound(wager_id))
    }

    fn query_unresolved_sync(&self, match_id: MatchId) -> Vec<Wager> {
        let candidates: Vec<WagerId> = self
            .unresolved
            .lock()
            .get(&match_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();

        candidates
            .into_iter()
            .filter_map(|id| self.get_wager_sync(id).ok())
            .filter(Wager::is_unresolved)
            .collect()
    }

    fn mark_resolved_sync(
        &self,
        wager_id: WagerId,
        outcome: Resolution,
        score: Score,
    ) -> Result<ResolveOutcome> {
        let account = self.owner_account(wager_id)?;
        let mut user = account.lock();
        let (user_id, current) = (user.id, user.balance);

        let wager = user
            .wager_mut(wager_id)
            .ok_or(WagerbookError::WagerNotFound(wager_id))?;
        if wager.resolution.is_terminal() {
            return Ok(ResolveOutcome::AlreadyResolved(wager.resolution));
        }
        let balance = balance::checked_credit(user_id, current, wager.payout_for(outcome))?;
        let credited = wager.resolve(outcome, score)?;
        let match_id = wager.match_id;
        user.balance = balance;

        let mut unresolved = self.unresolved.lock();
        if let Some(ids) = unresolved.get_mut(&match_id) {
            ids.remove(&wager_id);
            if ids.is_empty() {
                unresolved.remove(&match_id);
            }
        }
        Ok(ResolveOutcome::Applied { credited, balance })
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn create_user(&self, login: &str, role: Role, opening_balance: u64) -> Result<User> {
        self.create_user_sync(login, role, opening_balance)
    }

    async fn get_user(&self, user_id: UserId) -> Result<User> {
        let account = self.account(user_id)?;
        let user = account.lock().clone();
        Ok(user)
    }

    async fn atomic_adjust_balance(&self, user_id: UserId, delta: i64) -> Result<u64> {
        self.adjust_balance_sync(user_id, delta)
    }

    async fn append_wager(&self, wager: Wager) -> Result<u64> {
        self.append_wager_sync(wager)
    }

    async fn get_wager(&self, wager_id: WagerId) -> Result<Wager> {
        self.get_wager_sync(wager_id)
    }

    async fn query_unresolved_wagers(&self, match_id: MatchId) -> Result<Vec<Wager>> {
        Ok(self.query_unresolved_sync(match_id))
    }

    async fn mark_wager_resolved(
        &self,
        wager_id: WagerId,
        outcome: Resolution,
        score: Score,
    ) -> Result<ResolveOutcome> {
        self.mark_resolved_sync(wager_id, outcome, score)
    }
}
