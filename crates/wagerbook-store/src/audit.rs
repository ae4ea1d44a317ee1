//! Ledger reconciliation.
//!
//! Invariant checked for every audited account:
//! ```text
//! balance == net_funding − Σ stakes + Σ payouts      and      balance ≥ 0
//! ```
//! The second half is guaranteed by the `u64` register; the first catches
//! lost updates and double credits.

use std::collections::BTreeSet;

use wagerbook_types::{Result, UserId, WagerbookError};

use crate::ledger::LedgerStore;

/// Aggregates over the audited accounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditReport {
    pub accounts: usize,
    pub total_balance: u128,
    /// Stakes on wagers not yet settled.
    pub open_exposure: u128,
    pub total_paid_out: u128,
}

/// Reconcile each listed account. Duplicate ids are audited once.
///
/// # Errors
/// `LedgerInvariantViolation` naming every account that fails, or the
/// first store error encountered.
pub async fn audit_accounts(
    ledger: &dyn LedgerStore,
    users: impl IntoIterator<Item = UserId> + Send,
) -> Result<AuditReport> {
    let users: BTreeSet<UserId> = users.into_iter().collect();
    let mut report = AuditReport::default();
    let mut violations = Vec::new();

    for user_id in users {
        let user = ledger.get_user(user_id).await?;
        if let Err(err) = user.reconcile() {
            tracing::error!(user = %user_id, error = %err, "Ledger reconciliation failed");
            violations.push(err.to_string());
        }
        report.accounts += 1;
        report.total_balance += u128::from(user.balance);
        report.open_exposure += u128::from(user.open_exposure());
        report.total_paid_out += user.total_paid_out();
    }

    if violations.is_empty() {
        Ok(report)
    } else {
        Err(WagerbookError::LedgerInvariantViolation {
            reason: violations.join("; "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_ledger::InMemoryLedger;
    use wagerbook_types::{Amount, Match, Resolution, Role, Score, Wager};

    #[tokio::test]
    async fn clean_ledger_passes() {
        let ledger = InMemoryLedger::new();
        let alice = ledger.create_user("alice_1", Role::User, 100).await.unwrap();
        let bob = ledger.create_user("bobby_2", Role::User, 50).await.unwrap();
        let fixture = Match::dummy("Argentina", "France");

        let wager = Wager::new(
            alice.id,
            &fixture,
            fixture.selection("France").unwrap(),
            Amount::try_from(40).unwrap(),
        );
        ledger.append_wager(wager.clone()).await.unwrap();
        let pending = Wager::new(
            bob.id,
            &fixture,
            fixture.selection("Draw").unwrap(),
            Amount::try_from(10).unwrap(),
        );
        ledger.append_wager(pending).await.unwrap();
        ledger
            .mark_wager_resolved(wager.id, Resolution::Won, Score::new(0, 1))
            .await
            .unwrap();

        let report = audit_accounts(&ledger, [alice.id, bob.id, alice.id])
            .await
            .unwrap();
        assert_eq!(report.accounts, 2);
        assert_eq!(report.total_balance, 140 + 40);
        assert_eq!(report.open_exposure, 10);
        assert_eq!(report.total_paid_out, 80);
    }

    #[tokio::test]
    async fn unknown_account_is_an_error() {
        let ledger = InMemoryLedger::new();
        let err = audit_accounts(&ledger, [UserId::new()]).await.unwrap_err();
        assert!(matches!(err, WagerbookError::UserNotFound(_)));
    }
}
