//! JetBlack CLI - Command-line interface for Jet Black engine assets

pub mod commands;
pub mod progress;

use std::path::PathBuf;

use clap::Parser;
use commands::Commands;
use tracing_subscriber::EnvFilter;

use crate::config::DecodeOptions;

#[derive(Parser)]
#[command(name = "jetblack", version)]
#[command(about = "JetBlack: Dark Alliance engine asset decoders", long_about = None)]
struct Cli {
    /// TOML file with default decode options
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Run the JetBlack CLI
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "jetblack=info",
        1 => "jetblack=debug",
        _ => "jetblack=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let options = match &cli.config {
        Some(path) => DecodeOptions::load(path)?,
        None => DecodeOptions::default(),
    };
    cli.command.execute(&options)?;

    Ok(())
}
