//! Subscriber setup. Logs go to stderr so stdout stays machine-readable.

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;
use wagerbook_types::LogConfig;

/// Install the global subscriber. `RUST_LOG` overrides `config.filter`.
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)
            .with_context(|| format!("invalid log filter {:?}", config.filter))?,
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
    .map_err(|err| anyhow!(err).context("failed to install tracing subscriber"))
}
