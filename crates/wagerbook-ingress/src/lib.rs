//! # wagerbook-ingress
//!
//! Caller-facing operations that put money into the ledger.
//!
//! - [`WagerPlacement`]: validates a wager against the match and the
//!   caller's balance, then debits and records it atomically
//! - [`AccountService`]: opening, funding and reading accounts
//!
//! Both check the caller's [`Capability`](wagerbook_types::Capability)
//! before touching any store.

pub mod accounts;
pub mod placement;

pub use accounts::AccountService;
pub use placement::{WagerPlacement, WagerRecord, WagerRequest};
