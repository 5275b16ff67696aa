//! Quire CLI - documentation page tree engine.
//!
//! Provides commands for:
//! - `autofetch`: Refresh pages whose source schedule is due
//! - `fetch`: Refetch one page now
//! - `check`: Audit a snapshot against the tree invariants

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{AutofetchArgs, CheckArgs, FetchArgs};
use output::Output;

/// Quire - documentation page tree engine.
#[derive(Parser)]
#[command(name = "quire", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every page whose source schedule is due.
    Autofetch(AutofetchArgs),
    /// Refetch the source of one page.
    Fetch(FetchArgs),
    /// Audit a snapshot against the tree invariants.
    Check(CheckArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Autofetch(args) => args.common.verbose,
            Self::Fetch(args) => args.common.verbose,
            Self::Check(args) => args.common.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Autofetch(args) => args.execute(),
        Commands::Fetch(args) => args.execute(),
        Commands::Check(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
