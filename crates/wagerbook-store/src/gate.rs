//! Per-match placement gate.
//!
//! Placements hold a shared guard on the match across "is it open?" and the
//! ledger append; the finalize transition holds the exclusive guard. Once
//! the transition commits, any placement that acquires the gate afterwards
//! observes the finished status and is rejected, so no wager can appear on
//! a match after its sweep has enumerated the unresolved set.
//!
//! A gate exists only while someone holds or waits for it: the last guard
//! to go removes the map entry, whether the call it protected succeeded,
//! failed, or was cancelled mid-wait.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use wagerbook_types::MatchId;

type Gate = Arc<RwLock<()>>;

/// Each live gate with the number of guards holding or waiting on it.
type GateMap = Arc<Mutex<HashMap<MatchId, (Gate, usize)>>>;

/// A held (or pending) gate. Dropping it releases the lock and, if no one
/// else holds the gate, forgets it.
pub struct GateGuard<G> {
    guard: Option<G>,
    gate: Gate,
    match_id: MatchId,
    gates: GateMap,
}

pub type SharedGate = GateGuard<OwnedRwLockReadGuard<()>>;
pub type ExclusiveGate = GateGuard<OwnedRwLockWriteGuard<()>>;

impl<G> Drop for GateGuard<G> {
    fn drop(&mut self) {
        self.guard.take();
        let mut gates = self.gates.lock();
        let idle = match gates.get_mut(&self.match_id) {
            Some((gate, holders)) if Arc::ptr_eq(gate, &self.gate) => {
                *holders -= 1;
                *holders == 0
            }
            _ => false,
        };
        if idle {
            gates.remove(&self.match_id);
        }
    }
}

#[derive(Default)]
pub struct MatchGates {
    gates: GateMap,
}

impl MatchGates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn hold<G>(&self, match_id: MatchId) -> GateGuard<G> {
        let mut gates = self.gates.lock();
        let (gate, holders) = gates.entry(match_id).or_default();
        *holders += 1;
        let gate = Arc::clone(gate);
        drop(gates);
        GateGuard {
            guard: None,
            gate,
            match_id,
            gates: Arc::clone(&self.gates),
        }
    }

    /// Guard held by a placement.
    pub async fn shared(&self, match_id: MatchId) -> SharedGate {
        let mut held = self.hold(match_id);
        held.guard = Some(Arc::clone(&held.gate).read_owned().await);
        held
    }

    /// Guard held by the finalize transition.
    pub async fn exclusive(&self, match_id: MatchId) -> ExclusiveGate {
        let mut held = self.hold(match_id);
        held.guard = Some(Arc::clone(&held.gate).write_owned().await);
        held
    }

    /// Number of matches with a live gate.
    #[must_use]
    pub fn len(&self) -> usize {
        self.gates.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gates.lock().is_empty()
    }
}
