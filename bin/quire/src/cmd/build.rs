//! Build command - generates the static site

use std::{path::Path, time::Instant};

use color_eyre::eyre::{Result, WrapErr};
use quire_core::Config;
use quire_generator::Builder;

use crate::site_root;

/// Run the build command.
///
/// Builds the whole site, or only the post producing `only` when given.
pub fn run(config_path: &Path, only: Option<&str>) -> Result<()> {
    let start = Instant::now();
    tracing::info!(?config_path, ?only, "Starting build");

    let config = Config::load_with_env(config_path).wrap_err_with(|| {
        format!("Failed to load configuration from {}", config_path.display())
    })?;
    tracing::debug!(?config, "Loaded configuration");

    let builder = Builder::new(config, site_root(config_path));

    if let Some(file) = only {
        let path = builder
            .build_single(file)
            .wrap_err_with(|| format!("Failed to build {file}"))?;

        println!();
        println!("  Built {}", path.display());
        println!("  Duration:   {:.2}s", start.elapsed().as_secs_f64());
        println!();
        return Ok(());
    }

    let stats = builder.build().wrap_err("Build failed")?;
    let duration = start.elapsed();

    println!();
    println!("  Build completed successfully!");
    println!();
    println!("  Posts:       {}", stats.posts);
    println!("  Index pages: {}", stats.index_pages);
    println!("  Tag pages:   {}", stats.tag_pages);
    println!("  Menu pages:  {}", stats.menu_pages);
    println!();
    println!("  Duration:    {:.2}s", duration.as_secs_f64());
    println!("  Output:      {}", builder.output_dir().display());
    println!();

    tracing::info!(?stats, ?duration, "Build completed successfully");

    Ok(())
}
