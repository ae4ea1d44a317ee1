//! Configuration for the placement and settlement services.
//!
//! Every field has a default from [`crate::constants`], so an empty JSON
//! object is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, WagerbookError, constants};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WagerbookConfig {
    pub placement: PlacementConfig,
    pub settlement: SettlementConfig,
    pub log: LogConfig,
}

impl WagerbookConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| WagerbookError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        self.placement.validate()?;
        self.settlement.validate()
    }
}

/// Limits applied at wager placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlacementConfig {
    /// Largest single stake accepted. Must not exceed
    /// [`constants::MAX_WAGER_AMOUNT`].
    pub max_amount: u64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            max_amount: constants::MAX_WAGER_AMOUNT,
        }
    }
}

impl PlacementConfig {
    fn validate(&self) -> Result<()> {
        if self.max_amount == 0 || self.max_amount > constants::MAX_WAGER_AMOUNT {
            return Err(WagerbookError::Configuration(format!(
                "placement.max_amount must be in 1..={}",
                constants::MAX_WAGER_AMOUNT
            )));
        }
        Ok(())
    }
}

/// Settlement sweep tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SettlementConfig {
    /// Sweep passes per finalize/sweep call. The first pass counts.
    pub max_sweep_attempts: u32,
    /// Base delay between passes; pass `n` waits `n * backoff` plus jitter.
    pub sweep_backoff_ms: u64,
    /// Upper bound on concurrently running resolve-and-credit tasks.
    pub max_parallel_credits: usize,
    /// Reconcile every touched account after the sweep.
    pub audit_after_sweep: bool,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            max_sweep_attempts: constants::DEFAULT_MAX_SWEEP_ATTEMPTS,
            sweep_backoff_ms: constants::DEFAULT_SWEEP_BACKOFF_MS,
            max_parallel_credits: constants::DEFAULT_MAX_PARALLEL_CREDITS,
            audit_after_sweep: true,
        }
    }
}

impl SettlementConfig {
    fn validate(&self) -> Result<()> {
        if self.max_sweep_attempts == 0 {
            return Err(WagerbookError::Configuration(
                "settlement.max_sweep_attempts must be at least 1".into(),
            ));
        }
        if self.max_parallel_credits == 0 {
            return Err(WagerbookError::Configuration(
                "settlement.max_parallel_credits must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Logging output. `RUST_LOG` takes precedence over `filter`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    pub filter: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: constants::DEFAULT_LOG_FILTER.to_string(),
            json: false,
        }
    }
}
