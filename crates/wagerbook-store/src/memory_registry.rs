//! In-memory [`MatchRegistry`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::{Mutex, RwLock};
use wagerbook_types::{Match, MatchId, Result, Score, WagerbookError};

use crate::registry::MatchRegistry;

/// Process-local registry. Each match has its own mutex, so the finish
/// transition is a compare-and-set on that record alone.
#[derive(Default)]
pub struct InMemoryRegistry {
    matches: RwLock<HashMap<MatchId, Arc<Mutex<Match>>>>,
}

impl InMemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already-built record (fixtures imported from elsewhere).
    pub fn insert(&self, fixture: Match) -> MatchId {
        let id = fixture.id;
        self.matches.write().insert(id, Arc::new(Mutex::new(fixture)));
        id
    }

    fn record(&self, match_id: MatchId) -> Result<Arc<Mutex<Match>>> {
        self.matches
            .read()
            .get(&match_id)
            .cloned()
            .ok_or(WagerbookError::MatchNotFound(match_id))
    }
}

#[async_trait]
impl MatchRegistry for InMemoryRegistry {
    async fn create_match(
        &self,
        home_team: &str,
        guest_team: &str,
        date: NaiveDate,
    ) -> Result<Match> {
        let fixture = Match::new(home_team, guest_team, date)?;
        self.insert(fixture.clone());
        tracing::debug!(
            match_id = %fixture.id,
            home = %fixture.home_team,
            guest = %fixture.guest_team,
            date = %fixture.date,
            "Match registered"
        );
        Ok(fixture)
    }

    async fn get_match(&self, match_id: MatchId) -> Result<Match> {
        let record = self.record(match_id)?;
        let fixture = record.lock().clone();
        Ok(fixture)
    }

    async fn record_live_score(&self, match_id: MatchId, score: Score) -> Result<Match> {
        let record = self.record(match_id)?;
        let mut fixture = record.lock();
        fixture.record_live_score(score)?;
        Ok(fixture.clone())
    }

    async fn transition_to_finished(&self, match_id: MatchId, score: Score) -> Result<Match> {
        let record = self.record(match_id)?;
        let mut fixture = record.lock();
        fixture.finish(score)?;
        Ok(fixture.clone())
    }
}
