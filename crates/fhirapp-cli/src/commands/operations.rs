//! Lists generated operation ids, for wiring up an external dispatcher.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use console::style;
use fhirapp_core::{App, OperationDescriptor, PathSegment};

#[derive(Debug, Args)]
pub struct OperationsArgs {
    /// Path to the project file (defaults to resolving `fhirapp.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: &OperationsArgs) -> Result<()> {
    let (_project, app) = super::load_project(args.config.as_deref())?;

    let rows = rows(&app);
    if rows.is_empty() {
        println!("No operations declared.");
        return Ok(());
    }

    for (id, route) in rows {
        println!("{}  {}", style(route).cyan(), id);
    }
    Ok(())
}

/// `(operation id, "METHOD /path")` pairs in id order.
fn rows(app: &App) -> Vec<(String, String)> {
    app.registry()
        .operations()
        .iter()
        .map(|(id, descriptor)| (id.clone(), route_template(descriptor)))
        .collect()
}

fn route_template(descriptor: &OperationDescriptor) -> String {
    let path = descriptor
        .path
        .iter()
        .map(|segment| match segment {
            PathSegment::Literal(value) => value.clone(),
            PathSegment::Parameter { name } => format!("{{{name}}}"),
        })
        .collect::<Vec<_>>()
        .join("/");
    format!("{} /{path}", descriptor.method)
}
