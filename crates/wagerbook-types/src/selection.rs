//! Predicted and actual match outcomes.
//!
//! A [`Selection`] is what a wager bets on; the same type records a
//! finished match's winner, so settlement compares like with like.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::DRAW_SENTINEL;

/// A team name or the draw sentinel.
///
/// On the wire this is a plain string: the literal `"Draw"` maps to
/// [`Selection::Draw`], anything else names a team.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Selection {
    Team(String),
    Draw,
}

impl Selection {
    /// Match `raw` exactly against the two team names or the draw sentinel.
    #[must_use]
    pub fn resolve(raw: &str, home_team: &str, guest_team: &str) -> Option<Self> {
        if raw == DRAW_SENTINEL {
            Some(Self::Draw)
        } else if raw == home_team || raw == guest_team {
            Some(Self::Team(raw.to_string()))
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Team(name) => name,
            Self::Draw => DRAW_SENTINEL,
        }
    }
}

impl From<String> for Selection {
    fn from(raw: String) -> Self {
        if raw == DRAW_SENTINEL {
            Self::Draw
        } else {
            Self::Team(raw)
        }
    }
}

impl From<Selection> for String {
    fn from(selection: Selection) -> Self {
        match selection {
            Selection::Team(name) => name,
            Selection::Draw => DRAW_SENTINEL.to_string(),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A final or provisional scoreline. Absence of a score is modelled with
/// `Option<Score>` at the use site, so `0–0` is always an actual result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub guest: u32,
}

impl Score {
    #[must_use]
    pub fn new(home: u32, guest: u32) -> Self {
        Self { home, guest }
    }

    /// Home wins on a higher home score, guest on a higher guest score,
    /// otherwise the result is a draw.
    #[must_use]
    pub fn winner(&self, home_team: &str, guest_team: &str) -> Selection {
        match self.home.cmp(&self.guest) {
            std::cmp::Ordering::Greater => Selection::Team(home_team.to_string()),
            std::cmp::Ordering::Less => Selection::Team(guest_team.to_string()),
            std::cmp::Ordering::Equal => Selection::Draw,
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.home, self.guest)
    }
}
