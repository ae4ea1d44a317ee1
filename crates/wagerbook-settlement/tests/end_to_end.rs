//! End-to-end tests across placement and settlement.
//!
//! Accounts are opened through the account service, wagers go through
//! placement, and matches are finalized through the settlement engine,
//! all against shared in-memory stores.

use std::sync::Arc;

use wagerbook_ingress::{AccountService, WagerPlacement, WagerRequest};
use wagerbook_settlement::SettlementEngine;
use wagerbook_store::{
    FlakyLedger, InMemoryLedger, InMemoryRegistry, LedgerStore, MatchGates, MatchRegistry,
    audit_accounts,
};
use wagerbook_types::{
    MatchId, PlacementConfig, Principal, Resolution, Role, Score, Selection, SettlementConfig,
    UserId, WagerbookError, parse_match_date,
};

struct World {
    registry: Arc<InMemoryRegistry>,
    ledger: Arc<InMemoryLedger>,
    placement: Arc<WagerPlacement>,
    engine: Arc<SettlementEngine>,
    accounts: AccountService,
    admin: Principal,
}

impl World {
    fn new() -> Self {
        let ledger = Arc::new(InMemoryLedger::new());
        Self::over(ledger.clone(), ledger)
    }

    /// `store` is what the services talk to; `ledger` is the record behind it.
    fn over(ledger: Arc<InMemoryLedger>, store: Arc<dyn LedgerStore>) -> Self {
        let registry = Arc::new(InMemoryRegistry::new());
        let gates = Arc::new(MatchGates::new());
        let placement = WagerPlacement::new(
            registry.clone(),
            store.clone(),
            gates.clone(),
            PlacementConfig::default(),
        );
        let engine = SettlementEngine::new(
            registry.clone(),
            store.clone(),
            gates,
            SettlementConfig {
                sweep_backoff_ms: 2,
                ..SettlementConfig::default()
            },
        );
        Self {
            registry,
            ledger,
            placement: Arc::new(placement),
            engine: Arc::new(engine),
            accounts: AccountService::new(store),
            admin: Principal::new(UserId::new(), Role::Admin),
        }
    }

    async fn fixture(&self) -> MatchId {
        self.registry
            .create_match("Argentina", "France", parse_match_date("2022-12-18").unwrap())
            .await
            .unwrap()
            .id
    }

    async fn bettor(&self, login: &str, balance: u64) -> Principal {
        let user = self
            .accounts
            .open_account(&self.admin, login, Role::User, balance)
            .await
            .unwrap();
        Principal::new(user.id, user.role)
    }

    async fn bet(
        &self,
        who: &Principal,
        match_id: MatchId,
        selection: &str,
        amount: i64,
    ) -> wagerbook_types::Result<u64> {
        self.placement
            .place_wager(
                who,
                WagerRequest {
                    match_id,
                    selection: selection.into(),
                    amount: amount.into(),
                },
            )
            .await
            .map(|record| record.balance)
    }

    async fn balance(&self, who: &Principal) -> u64 {
        self.ledger.get_user(who.user_id).await.unwrap().balance
    }

    async fn audit(&self) {
        audit_accounts(self.ledger.as_ref(), self.ledger.user_ids())
            .await
            .unwrap();
    }
}

// =========================================================================
// Settlement scenarios
// =========================================================================

#[tokio::test]
async fn home_win_pays_home_backers_only() {
    let w = World::new();
    let match_id = w.fixture().await;
    let home = w.bettor("home_fan", 50).await;
    let guest = w.bettor("away_fan", 50).await;
    w.bet(&home, match_id, "Argentina", 50).await.unwrap();
    w.bet(&guest, match_id, "France", 50).await.unwrap();

    let summary = w
        .engine
        .finalize_match(&w.admin, match_id, Score::new(2, 1))
        .await
        .unwrap();
    assert_eq!(summary.winner, Selection::Team("Argentina".into()));
    assert_eq!((summary.won, summary.lost), (1, 1));
    assert_eq!(summary.total_credited, 100);

    assert_eq!(w.balance(&home).await, 100);
    assert_eq!(w.balance(&guest).await, 0);

    let home_wager = &w.ledger.get_user(home.user_id).await.unwrap().wagers[0];
    assert_eq!(home_wager.resolution, Resolution::Won);
    assert_eq!(home_wager.final_score, Some(Score::new(2, 1)));
    let guest_wager = &w.ledger.get_user(guest.user_id).await.unwrap().wagers[0];
    assert_eq!(guest_wager.resolution, Resolution::Lost);
    assert_eq!(guest_wager.payout, 0);
    w.audit().await;
}

#[tokio::test]
async fn level_score_pays_draw_backers_only() {
    let w = World::new();
    let match_id = w.fixture().await;
    let draw = w.bettor("draw_fan", 30).await;
    let home = w.bettor("home_fan", 30).await;
    let guest = w.bettor("away_fan", 30).await;
    w.bet(&draw, match_id, "Draw", 30).await.unwrap();
    w.bet(&home, match_id, "Argentina", 30).await.unwrap();
    w.bet(&guest, match_id, "France", 30).await.unwrap();

    let summary = w
        .engine
        .finalize_match(&w.admin, match_id, Score::new(1, 1))
        .await
        .unwrap();
    assert_eq!(summary.winner, Selection::Draw);
    assert_eq!((summary.won, summary.lost), (1, 2));
    assert_eq!(w.balance(&draw).await, 60);
    assert_eq!(w.balance(&home).await, 0);
    assert_eq!(w.balance(&guest).await, 0);
    w.audit().await;
}

#[tokio::test]
async fn second_finalize_changes_nothing() {
    let w = World::new();
    let match_id = w.fixture().await;
    let home = w.bettor("home_fan", 40).await;
    w.bet(&home, match_id, "Argentina", 40).await.unwrap();

    w.engine
        .finalize_match(&w.admin, match_id, Score::new(2, 1))
        .await
        .unwrap();
    let err = w
        .engine
        .finalize_match(&w.admin, match_id, Score::new(0, 3))
        .await
        .unwrap_err();
    assert!(matches!(err, WagerbookError::AlreadyFinalized(id) if id == match_id));

    let fixture = w.registry.get_match(match_id).await.unwrap();
    assert_eq!(fixture.final_score, Some(Score::new(2, 1)));
    assert_eq!(w.balance(&home).await, 80);
}

#[tokio::test]
async fn wagers_on_one_match_are_untouched_by_another() {
    let w = World::new();
    let final_one = w.fixture().await;
    let final_two = w.fixture().await;
    let fan = w.bettor("both_fan", 20).await;
    w.bet(&fan, final_one, "Argentina", 10).await.unwrap();
    w.bet(&fan, final_two, "France", 10).await.unwrap();

    w.engine
        .finalize_match(&w.admin, final_one, Score::new(1, 0))
        .await
        .unwrap();
    let user = w.ledger.get_user(fan.user_id).await.unwrap();
    assert_eq!(user.balance, 20);
    assert_eq!(user.open_exposure(), 10);

    let open = w.ledger.query_unresolved_wagers(final_two).await.unwrap();
    assert_eq!(open.len(), 1);
    w.audit().await;
}

#[tokio::test]
async fn placement_rejected_once_finalized() {
    let w = World::new();
    let match_id = w.fixture().await;
    let late = w.bettor("late_fan", 10).await;
    w.engine
        .finalize_match(&w.admin, match_id, Score::new(0, 0))
        .await
        .unwrap();
    let err = w.bet(&late, match_id, "Draw", 10).await.unwrap_err();
    assert!(matches!(err, WagerbookError::MatchClosed { .. }));
    assert_eq!(w.balance(&late).await, 10);
}

#[tokio::test]
async fn deposit_then_bet_then_withdraw_reconciles() {
    let w = World::new();
    let match_id = w.fixture().await;
    let fan = w.bettor("fund_fan", 0).await;
    assert!(matches!(
        w.bet(&fan, match_id, "Draw", 1).await.unwrap_err(),
        WagerbookError::InsufficientFunds { .. }
    ));

    w.accounts.adjust_balance(&w.admin, fan.user_id, 70).await.unwrap();
    w.bet(&fan, match_id, "France", 70).await.unwrap();
    w.engine
        .finalize_match(&w.admin, match_id, Score::new(0, 1))
        .await
        .unwrap();
    assert_eq!(
        w.accounts.adjust_balance(&w.admin, fan.user_id, -100).await.unwrap(),
        40
    );
    w.audit().await;
}

// =========================================================================
// Concurrency
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_placements_cannot_overdraw() {
    for _ in 0..20 {
        let w = Arc::new(World::new());
        let match_id = w.fixture().await;
        let fan = w.bettor("race_fan", 100).await;

        let a = tokio::spawn({
            let w = Arc::clone(&w);
            async move { w.bet(&fan, match_id, "Argentina", 60).await }
        });
        let b = tokio::spawn({
            let w = Arc::clone(&w);
            async move { w.bet(&fan, match_id, "France", 60).await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];

        let accepted = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(accepted, 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(WagerbookError::InsufficientFunds { needed: 60, available: 40 })
        )));
        assert_eq!(w.balance(&fan).await, 40);
        assert_eq!(w.ledger.get_user(fan.user_id).await.unwrap().wagers.len(), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_finalize_settles_once() {
    for _ in 0..20 {
        let w = Arc::new(World::new());
        let match_id = w.fixture().await;
        let home = w.bettor("home_fan", 25).await;
        w.bet(&home, match_id, "Argentina", 25).await.unwrap();

        let finals: Vec<_> = [Score::new(2, 1), Score::new(3, 0)]
            .into_iter()
            .map(|score| {
                let w = Arc::clone(&w);
                tokio::spawn(async move { w.engine.finalize_match(&w.admin, match_id, score).await })
            })
            .collect();
        let mut settled = 0;
        let mut rejected = 0;
        for handle in finals {
            match handle.await.unwrap() {
                Ok(summary) => {
                    settled += 1;
                    assert_eq!(summary.won, 1);
                }
                Err(WagerbookError::AlreadyFinalized(_)) => rejected += 1,
                Err(other) => panic!("unexpected {other}"),
            }
        }
        assert_eq!((settled, rejected), (1, 1));
        assert_eq!(w.balance(&home).await, 50);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sweeps_credit_once() {
    let w = Arc::new(World::new());
    let match_id = w.fixture().await;
    let mut fans = Vec::new();
    for i in 0..40 {
        let fan = w.bettor(&format!("fan_{i:04}"), 10).await;
        let pick = if i % 2 == 0 { "Argentina" } else { "Draw" };
        w.bet(&fan, match_id, pick, 10).await.unwrap();
        fans.push((fan, pick));
    }
    w.engine
        .finalize_match(&w.admin, match_id, Score::new(1, 0))
        .await
        .unwrap();

    let sweeps: Vec<_> = (0..4)
        .map(|_| {
            let w = Arc::clone(&w);
            tokio::spawn(async move { w.engine.sweep(&w.admin, match_id).await })
        })
        .collect();
    for sweep in sweeps {
        let summary = sweep.await.unwrap().unwrap();
        assert_eq!(summary.total_credited, 0);
    }

    for (fan, pick) in fans {
        let expected = if pick == "Argentina" { 20 } else { 0 };
        assert_eq!(w.balance(&fan).await, expected);
    }
    w.audit().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn placement_racing_finalize_is_settled_or_rejected() {
    for _ in 0..10 {
        let w = Arc::new(World::new());
        let match_id = w.fixture().await;
        let mut fans = Vec::new();
        for i in 0..16 {
            fans.push(w.bettor(&format!("racer_{i:03}"), 10).await);
        }

        let mut bets = Vec::new();
        for fan in fans.clone() {
            let w = Arc::clone(&w);
            bets.push(tokio::spawn(async move {
                w.bet(&fan, match_id, "Argentina", 10).await
            }));
        }
        let finalize = {
            let w = Arc::clone(&w);
            tokio::spawn(async move {
                w.engine
                    .finalize_match(&w.admin, match_id, Score::new(1, 0))
                    .await
            })
        };

        let mut accepted = 0;
        for bet in bets {
            match bet.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(WagerbookError::MatchClosed { .. }) => {}
                Err(other) => panic!("unexpected {other}"),
            }
        }
        let summary = finalize.await.unwrap().unwrap();
        assert!(summary.is_complete());
        assert_eq!(summary.won, accepted);

        assert!(w.ledger.query_unresolved_wagers(match_id).await.unwrap().is_empty());
        for fan in &fans {
            let user = w.ledger.get_user(fan.user_id).await.unwrap();
            let expected = if user.wagers.is_empty() { 10 } else { 20 };
            assert_eq!(user.balance, expected);
        }
        w.audit().await;
    }
}

// =========================================================================
// Storage failures
// =========================================================================

fn flaky_world() -> (World, Arc<FlakyLedger>) {
    let inner = Arc::new(InMemoryLedger::new());
    let flaky = Arc::new(FlakyLedger::new(inner.clone()));
    (World::over(inner, flaky.clone()), flaky)
}

#[tokio::test]
async fn failed_credits_are_retried_without_double_credit() {
    let (w, flaky) = flaky_world();
    let match_id = w.fixture().await;
    let dropped = w.bettor("drop_fan", 10).await;
    let lost_reply = w.bettor("lost_fan", 10).await;
    let steady = w.bettor("calm_fan", 10).await;
    for fan in [&dropped, &lost_reply, &steady] {
        w.bet(fan, match_id, "France", 10).await.unwrap();
    }

    flaky.fail_resolves_for(dropped.user_id, 1);
    flaky.lose_resolve_replies_for(lost_reply.user_id, 1);

    let summary = w
        .engine
        .finalize_match(&w.admin, match_id, Score::new(0, 2))
        .await
        .unwrap();
    assert!(summary.is_complete());
    assert_eq!(summary.attempts, 2);
    // Three first-pass calls and one retry: the lost-reply wager was
    // applied, so only the dropped one is still unresolved on pass two.
    assert_eq!(flaky.resolve_calls(), 4);

    for fan in [&dropped, &lost_reply, &steady] {
        assert_eq!(w.balance(fan).await, 20);
    }
    w.audit().await;
}

#[tokio::test]
async fn exhausted_retries_are_reported_and_swept_later() {
    let (w, flaky) = flaky_world();
    let match_id = w.fixture().await;
    let stuck = w.bettor("stuckfan", 10).await;
    let steady = w.bettor("calm_fan", 10).await;
    w.bet(&stuck, match_id, "Draw", 10).await.unwrap();
    w.bet(&steady, match_id, "Draw", 10).await.unwrap();

    let attempts = SettlementConfig::default().max_sweep_attempts;
    flaky.fail_resolves_for(stuck.user_id, usize::try_from(attempts).unwrap());

    let summary = w
        .engine
        .finalize_match(&w.admin, match_id, Score::new(2, 2))
        .await
        .unwrap();
    assert_eq!(summary.attempts, attempts);
    assert_eq!(summary.unsettled.len(), 1);
    assert_eq!(summary.unsettled[0].user_id, stuck.user_id);
    assert!(summary.unsettled[0].error.contains("WB_ERR_900"));
    assert_eq!(w.balance(&stuck).await, 0);
    assert_eq!(w.balance(&steady).await, 20);

    let retry = w.engine.sweep(&w.admin, match_id).await.unwrap();
    assert!(retry.is_complete());
    assert_eq!(retry.won, 1);
    assert_eq!(w.balance(&stuck).await, 20);
    assert_eq!(w.balance(&steady).await, 20);
    w.audit().await;
}
