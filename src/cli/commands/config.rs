//! Config Command
//!
//! Manage Baker Street configuration.
//!
//! Usage:
//!   bakerstreet config show [-f json]
//!   bakerstreet config path
//!   bakerstreet config init [-g] [--force]

use std::path::Path;

use crate::cli::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the merged effective configuration
pub fn show(explicit: Option<&Path>, format: &str) -> Result<()> {
    let config = ConfigLoader::load(explicit)?;
    println!("{}", ConfigLoader::render(&config, format == "json")?);
    Ok(())
}

/// Show configuration paths and whether they exist
pub fn path(explicit: Option<&Path>) -> Result<()> {
    let out = Output::new();
    let marker = |p: &Path| if p.exists() { "" } else { " (not found)" };

    out.header("Configuration Paths");
    match ConfigLoader::global_config_path() {
        Some(global) => out.field("Global", format!("{}{}", global.display(), marker(&global))),
        None => out.field("Global", "unavailable"),
    }
    let project = ConfigLoader::project_config_path();
    out.field("Project", format!("{}{}", project.display(), marker(&project)));
    if let Some(path) = explicit {
        out.field("Explicit", format!("{}{}", path.display(), marker(path)));
    }
    Ok(())
}

pub fn init(global: bool, force: bool) -> Result<()> {
    let path = ConfigLoader::init(global, force)?;
    Output::new().success(&format!(
        "Initialized {} configuration: {}",
        if global { "global" } else { "project" },
        path.display()
    ));
    Ok(())
}
