//! System-wide constants for the Wagerbook ledger.

/// Literal used for a drawn match, both as a wager selection and as a winner.
pub const DRAW_SENTINEL: &str = "Draw";

/// Even-money payout: a winning wager is credited its stake times this.
pub const PAYOUT_MULTIPLIER: u64 = 2;

/// Largest stake accepted for a single wager (minor units). Keeps
/// `amount * PAYOUT_MULTIPLIER` well inside `u64`.
pub const MAX_WAGER_AMOUNT: u64 = 1_000_000_000_000;

/// Date format accepted for match fixtures.
pub const MATCH_DATE_FORMAT: &str = "%Y-%m-%d";

/// Minimum login length for new accounts.
pub const MIN_LOGIN_LENGTH: usize = 6;

/// Default number of sweep passes before giving up on failing wagers.
pub const DEFAULT_MAX_SWEEP_ATTEMPTS: u32 = 3;

/// Default base delay between sweep passes in milliseconds.
pub const DEFAULT_SWEEP_BACKOFF_MS: u64 = 50;

/// Default cap on concurrently running resolve-and-credit tasks.
pub const DEFAULT_MAX_PARALLEL_CREDITS: usize = 32;

/// Default log filter when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Wagerbook";
