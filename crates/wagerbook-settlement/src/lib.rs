//! # wagerbook-settlement
//!
//! Match finalization and wager settlement.
//!
//! [`SettlementEngine::finalize_match`] makes the single open → finished
//! transition of a match and then sweeps its unresolved wagers, resolving
//! and crediting each exactly once. [`SettlementEngine::sweep`] re-runs the
//! sweep for a finished match, picking up whatever an earlier sweep left
//! behind.
//!
//! ## Guarantees
//!
//! - A match is finalized at most once; every later attempt fails with
//!   `AlreadyFinalized` and changes nothing
//! - A wager is credited zero or one times, however many sweeps run
//!   concurrently or are retried
//! - Credits for different users proceed in parallel

pub mod engine;
pub mod summary;

pub use engine::SettlementEngine;
pub use summary::{SettlementSummary, UnsettledWager};
