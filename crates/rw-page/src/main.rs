//! RW page CLI - inspect and simulate documentation page behaviors.
//!
//! Provides commands for:
//! - `inspect`: Show the tab groups, scroll spy and copy buttons bound on a page
//! - `simulate`: Replay scripted clicks, visibility changes and time on a page

mod clipboard;
mod commands;
mod error;
mod output;
mod script;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{InspectArgs, SimulateArgs};
use error::CliError;
use output::Output;

/// RW page - documentation page behaviors.
#[derive(Parser)]
#[command(name = "rw-page", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the behaviors bound on a rendered page.
    Inspect(InspectArgs),
    /// Replay an interaction script against a rendered page.
    Simulate(SimulateArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let verbose = matches!(&cli.command, Commands::Simulate(args) if args.verbose);
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Inspect(args) => args.execute(),
        Commands::Simulate(args) => tokio::runtime::Runtime::new()
            .map_err(CliError::from)
            .and_then(|rt| rt.block_on(args.execute())),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
