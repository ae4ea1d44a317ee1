//! Scenario replay.
//!
//! A scenario is a JSON list of steps run in order against fresh in-memory
//! stores. Accounts are referred to by login and matches by a label chosen
//! in the script. Steps the ledger rejects (insufficient funds, closed
//! match and the like) are recorded in the report and the replay
//! continues. Internal errors and references to undefined names abort it.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use wagerbook_ingress::{AccountService, WagerPlacement, WagerRequest};
use wagerbook_settlement::{SettlementEngine, SettlementSummary};
use wagerbook_store::{
    InMemoryLedger, InMemoryRegistry, LedgerStore, MatchGates, MatchRegistry, audit_accounts,
};
use wagerbook_types::{
    ErrorKind, Match, MatchId, Principal, RawAmount, Role, Score, User, UserId, WagerbookConfig,
    WagerbookError, parse_match_date,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing scenario {}", path.display()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    OpenAccount {
        login: String,
        #[serde(default)]
        role: Option<Role>,
        balance: u64,
    },
    AdjustBalance {
        login: String,
        delta: i64,
    },
    CreateMatch {
        label: String,
        home: String,
        guest: String,
        date: String,
    },
    LiveScore {
        label: String,
        home: u32,
        guest: u32,
    },
    PlaceWager {
        login: String,
        label: String,
        selection: String,
        amount: RawAmount,
    },
    Finalize {
        label: String,
        home: u32,
        guest: u32,
    },
    Sweep {
        label: String,
    },
}

impl Step {
    fn op(&self) -> &'static str {
        match self {
            Self::OpenAccount { .. } => "open_account",
            Self::AdjustBalance { .. } => "adjust_balance",
            Self::CreateMatch { .. } => "create_match",
            Self::LiveScore { .. } => "live_score",
            Self::PlaceWager { .. } => "place_wager",
            Self::Finalize { .. } => "finalize",
            Self::Sweep { .. } => "sweep",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub op: &'static str,
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<String>,
}

/// Final state of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub steps: Vec<StepReport>,
    pub settlements: Vec<SettlementSummary>,
    pub matches: BTreeMap<String, Match>,
    /// Ordered by login.
    pub accounts: Vec<User>,
    pub total_balance: u128,
}

impl ReplayReport {
    #[must_use]
    pub fn rejected(&self) -> usize {
        self.steps.iter().filter(|step| !step.accepted).count()
    }
}

pub struct Replayer {
    registry: Arc<InMemoryRegistry>,
    ledger: Arc<InMemoryLedger>,
    placement: WagerPlacement,
    settlement: SettlementEngine,
    accounts: AccountService,
    /// The replay runs as an operator vouched for upstream.
    operator: Principal,
    users: BTreeMap<String, Principal>,
    matches: BTreeMap<String, MatchId>,
    settlements: Vec<SettlementSummary>,
}

impl Replayer {
    #[must_use]
    pub fn new(config: &WagerbookConfig) -> Self {
        let registry = Arc::new(InMemoryRegistry::new());
        let ledger = Arc::new(InMemoryLedger::new());
        let gates = Arc::new(MatchGates::new());
        Self {
            placement: WagerPlacement::new(
                registry.clone(),
                ledger.clone(),
                gates.clone(),
                config.placement.clone(),
            ),
            settlement: SettlementEngine::new(
                registry.clone(),
                ledger.clone(),
                gates,
                config.settlement.clone(),
            ),
            accounts: AccountService::new(ledger.clone()),
            registry,
            ledger,
            operator: Principal::new(UserId::new(), Role::Admin),
            users: BTreeMap::new(),
            matches: BTreeMap::new(),
            settlements: Vec::new(),
        }
    }

    pub async fn run(mut self, scenario: Scenario) -> Result<ReplayReport> {
        let mut steps = Vec::with_capacity(scenario.steps.len());
        for (index, step) in scenario.steps.into_iter().enumerate() {
            let op = step.op();
            let rejection = match self.apply(step).await {
                Ok(()) => None,
                Err(err) => match err.downcast_ref::<WagerbookError>() {
                    Some(rejected) if rejected.kind() != ErrorKind::Internal => {
                        tracing::info!(index, op, error = %rejected, "Step rejected");
                        Some(rejected.to_string())
                    }
                    _ => return Err(err.context(format!("step {index} ({op}) failed"))),
                },
            };
            steps.push(StepReport {
                index,
                op,
                accepted: rejection.is_none(),
                rejection,
            });
        }
        self.report(steps).await
    }

    async fn apply(&mut self, step: Step) -> Result<()> {
        match step {
            Step::OpenAccount {
                login,
                role,
                balance,
            } => {
                let role = role.unwrap_or(Role::User);
                let user = self
                    .accounts
                    .open_account(&self.operator, &login, role, balance)
                    .await?;
                self.users.insert(login, Principal::new(user.id, user.role));
            }
            Step::AdjustBalance { login, delta } => {
                let user = self.user(&login)?;
                self.accounts
                    .adjust_balance(&self.operator, user.user_id, delta)
                    .await?;
            }
            Step::CreateMatch {
                label,
                home,
                guest,
                date,
            } => {
                let date = parse_match_date(&date)?;
                let fixture = self.registry.create_match(&home, &guest, date).await?;
                self.matches.insert(label, fixture.id);
            }
            Step::LiveScore { label, home, guest } => {
                let match_id = self.fixture(&label)?;
                self.registry
                    .record_live_score(match_id, Score::new(home, guest))
                    .await?;
            }
            Step::PlaceWager {
                login,
                label,
                selection,
                amount,
            } => {
                let who = self.user(&login)?;
                let match_id = self.fixture(&label)?;
                self.placement
                    .place_wager(
                        &who,
                        WagerRequest {
                            match_id,
                            selection,
                            amount,
                        },
                    )
                    .await?;
            }
            Step::Finalize { label, home, guest } => {
                let match_id = self.fixture(&label)?;
                let summary = self
                    .settlement
                    .finalize_match(&self.operator, match_id, Score::new(home, guest))
                    .await?;
                self.settlements.push(summary);
            }
            Step::Sweep { label } => {
                let match_id = self.fixture(&label)?;
                let summary = self.settlement.sweep(&self.operator, match_id).await?;
                self.settlements.push(summary);
            }
        }
        Ok(())
    }

    fn user(&self, login: &str) -> Result<Principal> {
        self.users
            .get(login)
            .copied()
            .ok_or_else(|| anyhow!("no account opened for login {login:?}"))
    }

    fn fixture(&self, label: &str) -> Result<MatchId> {
        self.matches
            .get(label)
            .copied()
            .ok_or_else(|| anyhow!("no match created with label {label:?}"))
    }

    async fn report(self, steps: Vec<StepReport>) -> Result<ReplayReport> {
        let ids = self.ledger.user_ids();
        audit_accounts(self.ledger.as_ref(), ids.iter().copied())
            .await
            .context("final ledger audit failed")?;

        let mut accounts = Vec::with_capacity(ids.len());
        for id in ids {
            accounts.push(self.ledger.get_user(id).await?);
        }
        accounts.sort_by(|a, b| a.login.cmp(&b.login));

        let mut matches = BTreeMap::new();
        for (label, id) in &self.matches {
            matches.insert(label.clone(), self.registry.get_match(*id).await?);
        }

        Ok(ReplayReport {
            steps,
            settlements: self.settlements,
            matches,
            total_balance: self.ledger.total_balance(),
            accounts,
        })
    }
}

/// Replay `path` with `config` and return the report.
pub async fn replay(path: &Path, config: &WagerbookConfig) -> Result<ReplayReport> {
    let scenario = Scenario::load(path)?;
    if scenario.steps.is_empty() {
        bail!("scenario {} has no steps", path.display());
    }
    tracing::info!(steps = scenario.steps.len(), script = %path.display(), "Replaying scenario");
    Replayer::new(config).run(scenario).await
}
