//! Command-line tool for fhirapp projects.
//!
//! Usage:
//! ```bash
//! fhirapp manifest                 # Print the app manifest as JSON
//! fhirapp operations               # List generated operation ids
//! fhirapp seed                     # Connect and create missing seed resources
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "fhirapp", author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the manifest built from the project file
    Manifest(commands::manifest::ManifestArgs),

    /// List the operation ids generated from the project file
    Operations(commands::operations::OperationsArgs),

    /// Create missing seed resources on the platform
    Seed(commands::seed::SeedArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("info".parse().context("failed to parse log directive")?),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Command::Manifest(args) => commands::manifest::run(args),
        Command::Operations(args) => commands::operations::run(args),
        Command::Seed(args) => commands::seed::run(args).await,
    }
}
