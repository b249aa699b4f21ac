//! Understudy Replay Binary
//!
//! Run with: `understudy-replay [OPTIONS] SCENARIO`

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use understudy::SubstituteConfig;
use understudy_replay::{run_with_config, Scenario};

#[derive(Parser)]
#[command(name = "understudy-replay")]
#[command(about = "Replay a call scenario against an understudy substitute")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Scenario file (TOML)
    #[arg(value_name = "SCENARIO")]
    scenario: Option<PathBuf>,

    /// Substitute configuration file; replaces the scenario's [config]
    #[arg(short = 'c', long, env = "UNDERSTUDY_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the default substitute configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    if let Some(Commands::Config) = &cli.command {
        print!("{}", SubstituteConfig::default().to_toml_string()?);
        return Ok(());
    }

    let Some(path) = &cli.scenario else {
        anyhow::bail!("no scenario file given");
    };

    debug!("Loading scenario: {}", path.display());
    let scenario = Scenario::load(path)
        .with_context(|| format!("Failed to load scenario: {}", path.display()))?;

    let config = match &cli.config {
        Some(config_path) => SubstituteConfig::load(config_path)
            .with_context(|| format!("Failed to load config file: {}", config_path.display()))?,
        None => scenario.config.clone(),
    };

    let report = run_with_config(&scenario, config)
        .with_context(|| format!("Failed to replay scenario: {}", path.display()))?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(report.to_json_lines()?.as_bytes())?;
    stdout.flush()?;

    if report.summary.passed() {
        info!("{} call(s) replayed, verification passed", report.summary.calls);
    } else {
        for failure in &report.summary.failures {
            error!("{}", failure);
        }
        std::process::exit(1);
    }

    Ok(())
}
