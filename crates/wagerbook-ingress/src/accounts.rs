//! Account administration: opening accounts, funding adjustments and reads.

use std::sync::Arc;

use wagerbook_store::LedgerStore;
use wagerbook_types::{
    Authorizer, Capability, Principal, Result, Role, RoleAuthorizer, User, UserId,
};

pub struct AccountService {
    ledger: Arc<dyn LedgerStore>,
    authorizer: Arc<dyn Authorizer>,
}

impl AccountService {
    #[must_use]
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self {
            ledger,
            authorizer: Arc::new(RoleAuthorizer),
        }
    }

    #[must_use]
    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    /// Open an account funded with `opening_balance`.
    ///
    /// # Errors
    /// `Forbidden`, `InvalidLogin`, `DuplicateUser`.
    pub async fn open_account(
        &self,
        principal: &Principal,
        login: &str,
        role: Role,
        opening_balance: u64,
    ) -> Result<User> {
        self.authorizer.authorize(principal, Capability::OpenAccount)?;
        let user = self.ledger.create_user(login, role, opening_balance).await?;
        tracing::info!(
            user = %user.id,
            login = %user.login,
            %role,
            opening_balance,
            by = %principal.user_id,
            "Account opened"
        );
        Ok(user)
    }

    /// Deposit (positive `delta`) or withdraw (negative `delta`) funds.
    /// Returns the new balance.
    ///
    /// # Errors
    /// `Forbidden`, `UserNotFound`, `InsufficientFunds` if the withdrawal
    /// would overdraw, `BalanceOverflow`.
    pub async fn adjust_balance(
        &self,
        principal: &Principal,
        user_id: UserId,
        delta: i64,
    ) -> Result<u64> {
        self.authorizer.authorize(principal, Capability::AdjustBalance)?;
        let balance = self.ledger.atomic_adjust_balance(user_id, delta).await?;
        tracing::info!(
            user = %user_id,
            delta,
            balance,
            by = %principal.user_id,
            "Balance adjusted"
        );
        Ok(balance)
    }

    /// Snapshot of an account and its wager history.
    ///
    /// # Errors
    /// `Forbidden` unless the principal owns the account or is an admin;
    /// `UserNotFound`.
    pub async fn account(&self, principal: &Principal, user_id: UserId) -> Result<User> {
        self.authorizer
            .authorize(principal, Capability::ReadAccount(user_id))?;
        self.ledger.get_user(user_id).await
    }
}
