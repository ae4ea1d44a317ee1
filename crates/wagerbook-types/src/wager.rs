//! # Wager: one stake in a user's append-only ledger
//!
//! ## State Machine
//!
//! ```text
//!                 settlement   ┌─────┐
//!              ┌──────────────▶│ WON │
//!   ┌──────────┴─┐             └─────┘
//!   │ UNRESOLVED │
//!   └──────────┬─┘             ┌──────┐
//!              └──────────────▶│ LOST │
//!                 settlement   └──────┘
//! ```
//!
//! The `UNRESOLVED` marker is the settlement checkpoint: only unresolved
//! wagers are candidates for a sweep, and a wager leaves that state in the
//! same atomic step that applies its payout.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, Match, MatchId, Result, Score, Selection, UserId, WagerId, WagerbookError};

/// Settlement state of a wager. Transitions are monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Unresolved,
    Won,
    Lost,
}

impl Resolution {
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Unresolved, Self::Won | Self::Lost))
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unresolved => write!(f, "UNRESOLVED"),
            Self::Won => write!(f, "WON"),
            Self::Lost => write!(f, "LOST"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wager {
    pub id: WagerId,
    pub user_id: UserId,
    pub match_id: MatchId,
    pub selection: Selection,
    pub amount: Amount,
    pub resolution: Resolution,
    pub placed_at: DateTime<Utc>,
    /// Fixture details as they stood when the wager was placed.
    pub home_team: String,
    pub guest_team: String,
    pub match_date: NaiveDate,
    /// Filled in by settlement.
    pub final_score: Option<Score>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Credit applied on resolution: `0` for lost wagers.
    pub payout: u64,
}

impl Wager {
    /// A fresh unresolved wager on `fixture`.
    #[must_use]
    pub fn new(user_id: UserId, fixture: &Match, selection: Selection, amount: Amount) -> Self {
        Self {
            id: WagerId::new(),
            user_id,
            match_id: fixture.id,
            selection,
            amount,
            resolution: Resolution::Unresolved,
            placed_at: Utc::now(),
            home_team: fixture.home_team.clone(),
            guest_team: fixture.guest_team.clone(),
            match_date: fixture.date,
            final_score: None,
            resolved_at: None,
            payout: 0,
        }
    }

    /// The terminal state this wager settles into given the match winner.
    #[must_use]
    pub fn outcome_against(&self, winner: &Selection) -> Resolution {
        if &self.selection == winner {
            Resolution::Won
        } else {
            Resolution::Lost
        }
    }

    /// Credit owed if this wager resolves to `outcome`.
    #[must_use]
    pub fn payout_for(&self, outcome: Resolution) -> u64 {
        match outcome {
            Resolution::Won => self.amount.payout(),
            Resolution::Lost | Resolution::Unresolved => 0,
        }
    }

    /// Move out of `Unresolved`. Returns the payout that must be credited
    /// in the same atomic step.
    ///
    /// # Errors
    /// - `AlreadyResolved` if the wager already left `Unresolved`
    /// - `Internal` if `outcome` is not a terminal state
    pub fn resolve(&mut self, outcome: Resolution, score: Score) -> Result<u64> {
        if self.resolution.is_terminal() {
            return Err(WagerbookError::AlreadyResolved(self.id));
        }
        if !self.resolution.can_transition_to(outcome) {
            return Err(WagerbookError::Internal(format!(
                "cannot resolve {} to {outcome}",
                self.id
            )));
        }
        let payout = self.payout_for(outcome);
        self.resolution = outcome;
        self.final_score = Some(score);
        self.resolved_at = Some(Utc::now());
        self.payout = payout;
        Ok(payout)
    }

    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        self.resolution == Resolution::Unresolved
    }
}
