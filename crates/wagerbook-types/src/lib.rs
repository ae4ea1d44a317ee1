//! # wagerbook-types
//!
//! Shared types, errors, and configuration for the **Wagerbook** ledger.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`UserId`], [`MatchId`], [`WagerId`]
//! - **Match model**: [`Match`], [`MatchStatus`], [`Score`], [`Selection`]
//! - **Wager model**: [`Wager`], [`Resolution`], [`Amount`]
//! - **Account model**: [`User`], [`Role`]
//! - **Authorization**: [`Principal`], [`Capability`], [`Authorizer`], [`RoleAuthorizer`]
//! - **Configuration**: [`WagerbookConfig`], [`PlacementConfig`], [`SettlementConfig`], [`LogConfig`]
//! - **Errors**: [`WagerbookError`] with `WB_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod amount;
pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod matches;
pub mod selection;
pub mod user;
pub mod wager;

// Re-export all primary types at crate root for ergonomic imports:
//   use wagerbook_types::{Match, Wager, User, Selection, ...};

pub use amount::*;
pub use auth::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use matches::*;
pub use selection::*;
pub use user::*;
pub use wager::*;

// Constants are accessed via `wagerbook_types::constants::FOO`
// (not re-exported to avoid name collisions).
