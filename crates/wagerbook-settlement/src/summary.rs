//! What a finalize or sweep call did.

use serde::{Deserialize, Serialize};
use wagerbook_types::{MatchId, Score, Selection, UserId, WagerId};

/// A wager still unresolved when a sweep gave up on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsettledWager {
    pub wager_id: WagerId,
    pub user_id: UserId,
    /// Last error seen for this wager.
    pub error: String,
}

/// Counts cover only the resolutions this call observed. A resolution that
/// was applied but whose reply was lost shows up in neither `won` nor
/// `lost`; the ledger still holds exactly one credit for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSummary {
    pub match_id: MatchId,
    pub winner: Selection,
    pub score: Score,
    pub won: usize,
    pub lost: usize,
    /// Wagers another sweep resolved first.
    pub skipped: usize,
    pub total_credited: u64,
    /// Sweep passes run, the first included.
    pub attempts: u32,
    pub unsettled: Vec<UnsettledWager>,
    /// Failures not tied to one wager: a listing of unresolved wagers that
    /// kept failing, or a post-sweep audit that could not read an account.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sweep_errors: Vec<String>,
}

impl SettlementSummary {
    #[must_use]
    pub fn new(match_id: MatchId, winner: Selection, score: Score) -> Self {
        Self {
            match_id,
            winner,
            score,
            won: 0,
            lost: 0,
            skipped: 0,
            total_credited: 0,
            attempts: 0,
            unsettled: Vec::new(),
            sweep_errors: Vec::new(),
        }
    }

    /// Every wager on the match left the unresolved state, and the sweep
    /// saw nothing that leaves that in doubt.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unsettled.is_empty() && self.sweep_errors.is_empty()
    }

    #[must_use]
    pub fn resolved(&self) -> usize {
        self.won + self.lost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_until_something_is_left_behind() {
        let mut summary =
            SettlementSummary::new(MatchId::new(), Selection::Draw, Score::new(1, 1));
        summary.won = 2;
        summary.lost = 3;
        assert!(summary.is_complete());
        assert_eq!(summary.resolved(), 5);

        summary.unsettled.push(UnsettledWager {
            wager_id: WagerId::new(),
            user_id: UserId::new(),
            error: "store unavailable".into(),
        });
        assert!(!summary.is_complete());
    }

    #[test]
    fn sweep_errors_make_it_incomplete() {
        let mut summary =
            SettlementSummary::new(MatchId::new(), Selection::Draw, Score::new(0, 0));
        summary
            .sweep_errors
            .push("listing unresolved wagers: store unavailable".into());
        assert!(summary.unsettled.is_empty());
        assert!(!summary.is_complete());

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["sweep_errors"][0], "listing unresolved wagers: store unavailable");
        let clean = SettlementSummary::new(MatchId::new(), Selection::Draw, Score::new(0, 0));
        assert!(serde_json::to_value(&clean).unwrap().get("sweep_errors").is_none());
    }

    #[test]
    fn serializes_winner_as_plain_string() {
        let summary = SettlementSummary::new(
            MatchId::new(),
            Selection::Team("Argentina".into()),
            Score::new(2, 1),
        );
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["winner"], "Argentina");
        assert_eq!(json["score"]["home"], 2);
    }
}
