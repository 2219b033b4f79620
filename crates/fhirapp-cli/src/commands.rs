//! CLI command implementations for `fhirapp`.
//!
//! Each command module exports an `*Args` struct implementing `clap::Args`
//! and a `run` function. All commands start from the project file, located
//! with `--config` or the unified resolution (`FHIRAPP_CONFIG_PATH`, then
//! the current and parent directories).

use std::path::Path;

use anyhow::{Context, Result};
use fhirapp_core::{App, ProjectConfig};

pub mod manifest;
pub mod operations;
pub mod seed;

/// Loads the project file and builds the app it declares.
pub(crate) fn load_project(config: Option<&Path>) -> Result<(ProjectConfig, App)> {
    let project = match config {
        Some(path) => ProjectConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ProjectConfig::load_resolved()
            .context("failed to resolve project config")?
            .context("no fhirapp.toml found in this directory or its parents")?,
    };

    let app = App::from_project(project.clone()).context("invalid project config")?;
    Ok((project, app))
}
