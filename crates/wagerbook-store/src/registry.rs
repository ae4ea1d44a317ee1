//! The match registry contract.

use async_trait::async_trait;
use chrono::NaiveDate;
use wagerbook_types::{Match, MatchId, Result, Score};

#[async_trait]
pub trait MatchRegistry: Send + Sync {
    /// Register an open fixture.
    ///
    /// # Errors
    /// `InvalidTeams`.
    async fn create_match(&self, home_team: &str, guest_team: &str, date: NaiveDate)
    -> Result<Match>;

    async fn get_match(&self, match_id: MatchId) -> Result<Match>;

    /// Update the provisional score of an open match.
    ///
    /// # Errors
    /// `MatchNotFound`, `AlreadyFinalized`.
    async fn record_live_score(&self, match_id: MatchId, score: Score) -> Result<Match>;

    /// The single open → finished transition. Succeeds for exactly one
    /// caller per match; returns the finished record with its winner set.
    ///
    /// # Errors
    /// `MatchNotFound`, `AlreadyFinalized`.
    async fn transition_to_finished(&self, match_id: MatchId, score: Score) -> Result<Match>;
}
