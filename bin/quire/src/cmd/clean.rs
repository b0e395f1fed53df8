//! Clean command - removes generated pages and feeds

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use quire_core::Config;
use quire_generator::Builder;

use crate::site_root;

/// Run the clean command.
pub fn run(config_path: &Path) -> Result<()> {
    let config = Config::load_with_env(config_path).wrap_err_with(|| {
        format!("Failed to load configuration from {}", config_path.display())
    })?;

    let builder = Builder::new(config, site_root(config_path));
    let removed = builder.clean().wrap_err("Clean failed")?;

    println!("  Removed {removed} generated files from {}", builder.output_dir().display());
    tracing::info!(removed, "Clean completed");

    Ok(())
}
