//! Match finalization and the settlement sweep.
//!
//! ## Finalize
//!
//! 1. Capability check (`FinalizeMatch`)
//! 2. Exclusive gate on the match: waits out in-flight placements
//! 3. Registry `transition_to_finished`: the single open → finished step;
//!    a second caller gets `AlreadyFinalized` and nothing else happens
//! 4. Sweep
//!
//! Once step 3 commits, finalize no longer fails on store trouble: the
//! summary reports what was left undone and `sweep` finishes it.
//!
//! ## Sweep
//!
//! Each pass re-reads the unresolved wagers of the match and resolves them
//! concurrently, one task per wager, bounded by `max_parallel_credits`.
//! Resolution and credit are one ledger step, so a pass can be repeated
//! any number of times without crediting a wager twice. Passes repeat
//! while retryable failures remain, up to `max_sweep_attempts`, with a
//! linear backoff plus jitter between them.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use wagerbook_store::{LedgerStore, MatchGates, MatchRegistry, ResolveOutcome, audit_accounts};
use wagerbook_types::{
    Authorizer, Capability, Match, MatchId, Principal, Resolution, Result, RoleAuthorizer, Score,
    Selection, SettlementConfig, UserId, Wager, WagerId, WagerbookError,
};

use crate::summary::{SettlementSummary, UnsettledWager};

/// One resolve-and-credit task's result.
struct Credit {
    wager_id: WagerId,
    user_id: UserId,
    outcome: Resolution,
    result: Result<ResolveOutcome>,
}

pub struct SettlementEngine {
    registry: Arc<dyn MatchRegistry>,
    ledger: Arc<dyn LedgerStore>,
    gates: Arc<MatchGates>,
    authorizer: Arc<dyn Authorizer>,
    config: SettlementConfig,
}

impl SettlementEngine {
    /// Engine using the default [`RoleAuthorizer`]. `gates` must be the
    /// instance shared with wager placement.
    #[must_use]
    pub fn new(
        registry: Arc<dyn MatchRegistry>,
        ledger: Arc<dyn LedgerStore>,
        gates: Arc<MatchGates>,
        config: SettlementConfig,
    ) -> Self {
        Self {
            registry,
            ledger,
            gates,
            authorizer: Arc::new(RoleAuthorizer),
            config,
        }
    }

    #[must_use]
    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    /// Record the final score of an open match and settle every wager on it.
    ///
    /// # Errors
    /// `Forbidden`, `MatchNotFound`, `AlreadyFinalized`, or
    /// `LedgerInvariantViolation` from the post-sweep audit. Wagers the
    /// sweep could not settle are listed in [`SettlementSummary::unsettled`]
    /// and other store failures in [`SettlementSummary::sweep_errors`]
    /// rather than failing the call; the match stays finished and
    /// [`sweep`](Self::sweep) completes them.
    pub async fn finalize_match(
        &self,
        principal: &Principal,
        match_id: MatchId,
        score: Score,
    ) -> Result<SettlementSummary> {
        self.authorizer
            .authorize(principal, Capability::FinalizeMatch)?;

        let transition = {
            let _gate = self.gates.exclusive(match_id).await;
            self.registry.transition_to_finished(match_id, score).await
        };
        let finished = match transition {
            Ok(finished) => finished,
            Err(err) => {
                tracing::debug!(%match_id, %score, error = %err, "Finalize rejected");
                return Err(err);
            }
        };

        tracing::info!(
            %match_id,
            %score,
            winner = ?finished.winner,
            by = %principal.user_id,
            "Match finalized"
        );
        self.settle(&finished).await
    }

    /// Re-run settlement for a finished match. Wagers already resolved are
    /// left alone.
    ///
    /// # Errors
    /// `Forbidden`, `MatchNotFound`, `MatchNotFinished`, a store error
    /// reading the match, or `LedgerInvariantViolation`.
    pub async fn sweep(&self, principal: &Principal, match_id: MatchId) -> Result<SettlementSummary> {
        self.authorizer.authorize(principal, Capability::SweepMatch)?;
        let fixture = self.registry.get_match(match_id).await?;
        if fixture.is_open() {
            return Err(WagerbookError::MatchNotFinished(match_id));
        }
        self.settle(&fixture).await
    }

    async fn settle(&self, fixture: &Match) -> Result<SettlementSummary> {
        let (Some(winner), Some(score)) = (fixture.winner.clone(), fixture.final_score) else {
            return Err(WagerbookError::Internal(format!(
                "{} is {} without a final result",
                fixture.id, fixture.status
            )));
        };
        let match_id = fixture.id;
        let max_attempts = self.config.max_sweep_attempts.max(1);

        let mut summary = SettlementSummary::new(match_id, winner.clone(), score);
        let mut touched = BTreeSet::new();
        let mut failures: HashMap<WagerId, (UserId, WagerbookError)> = HashMap::new();
        let mut clean = false;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = self.backoff(attempt - 1);
                tracing::debug!(%match_id, attempt, ?delay, "Sweep retry");
                tokio::time::sleep(delay).await;
            }
            summary.attempts = attempt;

            let pending = match self.ledger.query_unresolved_wagers(match_id).await {
                Ok(pending) => pending,
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    tracing::warn!(%match_id, attempt, error = %err, "Unresolved wager query failed");
                    continue;
                }
                Err(err) => {
                    tracing::warn!(%match_id, attempt, error = %err, "Giving up on unresolved wager query");
                    summary
                        .sweep_errors
                        .push(format!("listing unresolved wagers: {err}"));
                    break;
                }
            };
            if pending.is_empty() {
                clean = true;
                break;
            }

            failures.clear();
            let (credits, aborted) = self.credit_pass(pending, &winner, score).await;
            for credit in credits {
                touched.insert(credit.user_id);
                let (wager_id, user_id) = (credit.wager_id, credit.user_id);
                if let Err(err) = tally(&mut summary, credit, attempt) {
                    failures.insert(wager_id, (user_id, err));
                }
            }

            if failures.is_empty() && aborted == 0 {
                clean = true;
                break;
            }
            let retryable = aborted > 0 || failures.values().any(|(_, err)| err.is_retryable());
            if !retryable {
                break;
            }
        }

        if !clean {
            summary.unsettled = self.leftovers(match_id, &failures, summary.attempts).await;
        }

        if self.config.audit_after_sweep && !touched.is_empty() {
            match audit_accounts(self.ledger.as_ref(), touched).await {
                Ok(report) => tracing::debug!(
                    %match_id,
                    accounts = report.accounts,
                    open_exposure = report.open_exposure,
                    "Post-sweep audit passed"
                ),
                Err(err @ WagerbookError::LedgerInvariantViolation { .. }) => return Err(err),
                Err(err) => {
                    tracing::warn!(%match_id, error = %err, "Post-sweep audit incomplete");
                    summary.sweep_errors.push(format!("post-sweep audit: {err}"));
                }
            }
        }

        if summary.is_complete() {
            tracing::info!(
                %match_id,
                winner = %summary.winner,
                won = summary.won,
                lost = summary.lost,
                skipped = summary.skipped,
                credited = summary.total_credited,
                attempts = summary.attempts,
                "Match settled"
            );
        } else {
            tracing::warn!(
                %match_id,
                unsettled = summary.unsettled.len(),
                sweep_errors = summary.sweep_errors.len(),
                attempts = summary.attempts,
                "Match partially settled"
            );
        }
        Ok(summary)
    }

    /// Resolve every pending wager in its own task. Returns the finished
    /// tasks and the number that panicked or were cancelled.
    async fn credit_pass(
        &self,
        pending: Vec<Wager>,
        winner: &Selection,
        score: Score,
    ) -> (Vec<Credit>, usize) {
        let limiter = Arc::new(Semaphore::new(
            self.config.max_parallel_credits.clamp(1, Semaphore::MAX_PERMITS),
        ));
        let mut tasks = JoinSet::new();

        for wager in pending {
            let outcome = wager.outcome_against(winner);
            let (wager_id, user_id) = (wager.id, wager.user_id);
            let ledger = Arc::clone(&self.ledger);
            let limiter = Arc::clone(&limiter);
            tasks.spawn(async move {
                let result = match limiter.acquire_owned().await {
                    Ok(_permit) => ledger.mark_wager_resolved(wager_id, outcome, score).await,
                    Err(_) => Err(WagerbookError::Internal("credit limiter closed".into())),
                };
                Credit {
                    wager_id,
                    user_id,
                    outcome,
                    result,
                }
            });
        }

        let mut credits = Vec::with_capacity(tasks.len());
        let mut aborted = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(credit) => credits.push(credit),
                Err(err) => {
                    aborted += 1;
                    tracing::error!(error = %err, "Resolution task aborted");
                }
            }
        }
        (credits, aborted)
    }

    /// Wagers still unresolved after the last pass, with the last error
    /// seen for each.
    async fn leftovers(
        &self,
        match_id: MatchId,
        failures: &HashMap<WagerId, (UserId, WagerbookError)>,
        attempts: u32,
    ) -> Vec<UnsettledWager> {
        let describe = |wager_id: &WagerId| {
            failures.get(wager_id).map_or_else(
                || format!("still unresolved after {attempts} sweep passes"),
                |(_, err)| err.to_string(),
            )
        };
        match self.ledger.query_unresolved_wagers(match_id).await {
            Ok(remaining) => remaining
                .into_iter()
                .map(|wager| UnsettledWager {
                    error: describe(&wager.id),
                    wager_id: wager.id,
                    user_id: wager.user_id,
                })
                .collect(),
            Err(err) => {
                tracing::warn!(%match_id, error = %err, "Could not list unsettled wagers");
                failures
                    .iter()
                    .map(|(wager_id, (user_id, err))| UnsettledWager {
                        wager_id: *wager_id,
                        user_id: *user_id,
                        error: err.to_string(),
                    })
                    .collect()
            }
        }
    }

    /// Delay before pass `retry + 1`: `retry * backoff` plus up to half a
    /// backoff of jitter.
    fn backoff(&self, retry: u32) -> Duration {
        let step = self.config.sweep_backoff_ms;
        let base = step.saturating_mul(u64::from(retry));
        let jitter = if step < 2 {
            0
        } else {
            rand::thread_rng().gen_range(0..=step / 2)
        };
        Duration::from_millis(base.saturating_add(jitter))
    }
}

/// Fold one task's result into the summary, handing back its error.
fn tally(summary: &mut SettlementSummary, credit: Credit, attempt: u32) -> Result<()> {
    let match_id = summary.match_id;
    match credit.result {
        Ok(ResolveOutcome::Applied { credited, balance }) => {
            if credit.outcome == Resolution::Won {
                summary.won += 1;
            } else {
                summary.lost += 1;
            }
            summary.total_credited = summary.total_credited.saturating_add(credited);
            tracing::debug!(
                %match_id,
                wager = %credit.wager_id,
                user = %credit.user_id,
                outcome = %credit.outcome,
                credited,
                balance,
                "Wager resolved"
            );
            Ok(())
        }
        Ok(ResolveOutcome::AlreadyResolved(prior)) => {
            summary.skipped += 1;
            tracing::debug!(
                %match_id,
                wager = %credit.wager_id,
                resolution = %prior,
                "Wager already resolved"
            );
            Ok(())
        }
        Err(err) => {
            tracing::warn!(
                %match_id,
                wager = %credit.wager_id,
                user = %credit.user_id,
                attempt,
                retryable = err.is_retryable(),
                error = %err,
                "Wager resolution failed"
            );
            Err(err)
        }
    }
}
