//! `wagerbook`: replay wager scenarios and check configuration files.
//!
//! Usage:
//!   wagerbook replay --script demos/scenario.json [--config wagerbook.json]
//!   wagerbook check-config --config wagerbook.json

mod logging;
mod scenario;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use wagerbook_types::WagerbookConfig;
use wagerbook_types::constants::{ENGINE_NAME, VERSION};

#[derive(Parser, Debug)]
#[command(name = "wagerbook", version, about = "Match-outcome wager ledger")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a JSON scenario against in-memory stores and print the final ledger.
    Replay {
        #[arg(long)]
        script: PathBuf,

        #[arg(long, env = "WAGERBOOK_CONFIG")]
        config: Option<PathBuf>,

        /// Print the report on a single line.
        #[arg(long)]
        compact: bool,
    },
    /// Validate a configuration file and print it with defaults filled in.
    CheckConfig {
        #[arg(long, env = "WAGERBOOK_CONFIG")]
        config: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> Result<WagerbookConfig> {
    match path {
        Some(path) => WagerbookConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(WagerbookConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Replay {
            script,
            config,
            compact,
        } => {
            let config = load_config(config.as_deref())?;
            logging::init(&config.log)?;
            tracing::info!(engine = ENGINE_NAME, version = VERSION, "Starting replay");

            let report = scenario::replay(&script, &config).await?;
            let rendered = if compact {
                serde_json::to_string(&report)?
            } else {
                serde_json::to_string_pretty(&report)?
            };
            println!("{rendered}");
            tracing::info!(
                steps = report.steps.len(),
                rejected = report.rejected(),
                settlements = report.settlements.len(),
                "Replay finished"
            );
        }
        Command::CheckConfig { config } => {
            let loaded = load_config(Some(config.as_path()))?;
            println!("{}", serde_json::to_string_pretty(&loaded)?);
        }
    }
    Ok(())
}
