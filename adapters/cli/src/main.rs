#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Horde Arena scenarios headlessly.

mod scenario;
mod simulation;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use scenario::Scenario;

/// Runs a spawn-and-avoidance scenario without a window and prints a summary.
#[derive(Parser, Debug)]
#[command(name = "horde-arena", author, version, about, long_about = None)]
struct Cli {
    /// Scenario TOML file; built-in defaults are used when omitted.
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Overrides the scenario's RNG seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Overrides the number of waves to clear.
    #[arg(long)]
    waves: Option<u32>,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log: String,

    /// Prints the effective scenario as TOML and exits.
    #[arg(long, default_value_t = false)]
    print_config: bool,
}

/// Entry point for the Horde Arena command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log)?;

    let mut scenario = match &cli.scenario {
        Some(path) => scenario::load(path)?,
        None => Scenario::default(),
    };
    if let Some(seed) = cli.seed {
        scenario.engine.seed = seed;
    }
    if let Some(waves) = cli.waves {
        scenario.simulation.waves = waves;
    }

    if cli.print_config {
        let rendered =
            toml::to_string_pretty(&scenario).context("failed to serialise scenario as toml")?;
        print!("{rendered}");
        return Ok(());
    }

    tracing::info!(
        seed = scenario.engine.seed,
        waves = scenario.simulation.waves,
        "starting headless run"
    );
    let summary = simulation::run(scenario)?;
    println!("{summary}");
    Ok(())
}

fn init_tracing(default_filter: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .with_context(|| format!("invalid log filter `{default_filter}`"))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow!("failed to install tracing subscriber: {error}"))
}
