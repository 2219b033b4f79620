//! Runs the connect sequence against a platform: seeds missing resources.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use fhirapp_client::FhirClient;
use fhirapp_core::{ConfigFile, ConnectionConfig, ProjectConfig};
use tracing::info;

#[derive(Debug, Args)]
pub struct SeedArgs {
    /// Path to the project file (defaults to resolving `fhirapp.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to a credentials file (defaults to `[connection]` in the project
    /// file, then `~/.config/fhirapp/credentials.toml`).
    #[arg(long)]
    pub credentials: Option<PathBuf>,
}

pub async fn run(args: &SeedArgs) -> Result<()> {
    let (project, mut app) = super::load_project(args.config.as_deref())?;
    let connection = connection(args, &project)?;

    let client = FhirClient::from_config(&connection).context("failed to create client")?;
    info!(base_url = %client.base_url(), "Connecting to platform");

    let report = app
        .connect(Arc::new(client))
        .await
        .context("seeding failed")?;

    for (resource_type, id) in &report.created {
        println!("{} {resource_type}/{id}", style("created").green());
    }
    for (resource_type, id) in &report.existing {
        println!("{} {resource_type}/{id}", style("exists ").dim());
    }
    Ok(())
}

fn connection(args: &SeedArgs, project: &ProjectConfig) -> Result<ConnectionConfig> {
    if let Some(path) = &args.credentials {
        let file = ConfigFile::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        return file
            .into_credentials()
            .context("--credentials must point to a credentials.toml file");
    }

    if let Some(connection) = &project.connection {
        return Ok(connection.clone());
    }

    ConnectionConfig::load_resolved()
        .context("failed to resolve credentials")?
        .context("no connection configured: add [connection] to fhirapp.toml or create ~/.config/fhirapp/credentials.toml")
}
