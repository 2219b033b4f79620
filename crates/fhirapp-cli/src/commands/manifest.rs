//! Prints the app manifest declared by a project file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use fhirapp_core::App;

#[derive(Debug, Args)]
pub struct ManifestArgs {
    /// Path to the project file (defaults to resolving `fhirapp.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the manifest on a single line.
    #[arg(long)]
    pub compact: bool,
}

pub fn run(args: &ManifestArgs) -> Result<()> {
    let (_project, app) = super::load_project(args.config.as_deref())?;
    println!("{}", render(&app, args.compact)?);
    Ok(())
}

fn render(app: &App, compact: bool) -> Result<String> {
    let manifest = app.build_manifest();
    let rendered = if compact {
        serde_json::to_string(&manifest)
    } else {
        serde_json::to_string_pretty(&manifest)
    };
    rendered.context("failed to serialize manifest")
}
