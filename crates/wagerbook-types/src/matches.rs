//! Match records as held by the match registry.
//!
//! ## State Machine
//!
//! ```text
//!   ┌──────┐  finalize   ┌──────────┐
//!   │ OPEN ├────────────▶│ FINISHED │
//!   └──────┘             └──────────┘
//! ```
//!
//! The single edge fires settlement. `FINISHED` is terminal and the record
//! is immutable from then on.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DRAW_SENTINEL, MATCH_DATE_FORMAT};
use crate::{MatchId, Result, Score, Selection, WagerbookError};

/// Lifecycle status of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Open,
    Finished,
}

impl MatchStatus {
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Open, Self::Finished))
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Finished => write!(f, "FINISHED"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub home_team: String,
    pub guest_team: String,
    pub date: NaiveDate,
    pub status: MatchStatus,
    /// Provisional score while the match is in progress.
    pub live_score: Option<Score>,
    /// Present iff `status == Finished`.
    pub final_score: Option<Score>,
    /// Present iff `status == Finished`.
    pub winner: Option<Selection>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Match {
    /// Create an open match after validating team names.
    pub fn new(home_team: &str, guest_team: &str, date: NaiveDate) -> Result<Self> {
        validate_teams(home_team, guest_team)?;
        Ok(Self {
            id: MatchId::new(),
            home_team: home_team.to_string(),
            guest_team: guest_team.to_string(),
            date,
            status: MatchStatus::Open,
            live_score: None,
            final_score: None,
            winner: None,
            created_at: Utc::now(),
            finished_at: None,
        })
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == MatchStatus::Open
    }

    /// Resolve a caller-supplied selection string against this match.
    pub fn selection(&self, raw: &str) -> Result<Selection> {
        Selection::resolve(raw, &self.home_team, &self.guest_team).ok_or_else(|| {
            WagerbookError::InvalidSelection {
                match_id: self.id,
                selection: raw.to_string(),
            }
        })
    }

    /// Update the provisional score. Only legal while open.
    pub fn record_live_score(&mut self, score: Score) -> Result<()> {
        if !self.is_open() {
            return Err(WagerbookError::AlreadyFinalized(self.id));
        }
        self.live_score = Some(score);
        Ok(())
    }

    /// Perform the open → finished transition, fixing score and winner
    /// together.
    ///
    /// # Errors
    /// Returns `AlreadyFinalized` if the match is not open; the record is
    /// left untouched in that case.
    pub fn finish(&mut self, score: Score) -> Result<&Selection> {
        if !self.status.can_transition_to(MatchStatus::Finished) {
            return Err(WagerbookError::AlreadyFinalized(self.id));
        }
        self.status = MatchStatus::Finished;
        self.live_score = Some(score);
        self.final_score = Some(score);
        self.finished_at = Some(Utc::now());
        Ok(self
            .winner
            .insert(score.winner(&self.home_team, &self.guest_team)))
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_match_date(raw: &str) -> Result<NaiveDate> {
    // chrono accepts unpadded fields; the wire format requires exactly 10 chars.
    if raw.len() != 10 {
        return Err(WagerbookError::MalformedDate(raw.to_string()));
    }
    NaiveDate::parse_from_str(raw, MATCH_DATE_FORMAT)
        .map_err(|_| WagerbookError::MalformedDate(raw.to_string()))
}

fn validate_teams(home_team: &str, guest_team: &str) -> Result<()> {
    let reason = if home_team.trim().is_empty() || guest_team.trim().is_empty() {
        "team names must not be empty"
    } else if home_team == guest_team {
        "home and guest team must differ"
    } else if home_team == DRAW_SENTINEL || guest_team == DRAW_SENTINEL {
        "\"Draw\" is reserved and cannot name a team"
    } else {
        return Ok(());
    };
    Err(WagerbookError::InvalidTeams {
        reason: reason.to_string(),
    })
}

/// Dummy match for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Match {
    pub fn dummy(home_team: &str, guest_team: &str) -> Self {
        let date = NaiveDate::from_ymd_opt(2022, 12, 18).expect("valid calendar date");
        Self::new(home_team, guest_team, date).expect("dummy teams are valid")
    }
}
