//! # wagerbook-store
//!
//! Store contracts for the two collaborators the ledger core talks to, plus
//! process-local implementations of both.
//!
//! ## Architecture
//!
//! 1. **LedgerStore**: per-user balance and append-only wager history,
//!    exposed only through atomic conditional mutations
//! 2. **MatchRegistry**: fixtures and the single open → finished transition
//! 3. **balance**: the checked arithmetic every balance mutation goes through
//! 4. **MatchGates**: per-match shared/exclusive guard separating placements
//!    from the finalize transition
//! 5. **audit**: reconciliation of balances against wager history
//!
//! There is no global lock: each account and each match is serialized on
//! its own.

pub mod audit;
pub mod balance;
#[cfg(any(test, feature = "test-helpers"))]
pub mod flaky;
pub mod gate;
pub mod ledger;
pub mod memory_ledger;
pub mod memory_registry;
pub mod registry;

pub use audit::{AuditReport, audit_accounts};
#[cfg(any(test, feature = "test-helpers"))]
pub use flaky::FlakyLedger;
pub use gate::{ExclusiveGate, GateGuard, MatchGates, SharedGate};
pub use ledger::{LedgerStore, ResolveOutcome};
pub use memory_ledger::InMemoryLedger;
pub use memory_registry::InMemoryRegistry;
pub use registry::MatchRegistry;
