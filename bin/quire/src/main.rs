//! Quire CLI
//!
//! Static site generator for dated posts, sketches and games.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;

/// Command-line interface for Quire.
#[derive(Parser)]
#[command(
    name = "quire",
    version,
    about = "A static site generator for dated posts, sketches and games"
)]
struct Cli {
    /// Path to configuration file; its directory is the site root
    #[arg(short, long, default_value = "quire.toml")]
    config: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Build the site
    Build {
        /// Only rebuild the post producing this file (e.g. cubic_noise.html)
        #[arg(long, value_name = "FILE")]
        only: Option<String>,
    },
    /// Remove generated pages and feeds
    Clean,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    quire::init_tracing(cli.verbose);

    match cli.command {
        Commands::Build { only } => quire::cmd::build::run(&cli.config, only.as_deref())?,
        Commands::Clean => quire::cmd::clean::run(&cli.config)?,
    }

    Ok(())
}
