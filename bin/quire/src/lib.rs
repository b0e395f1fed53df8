//! Quire CLI Library
//!
//! Command implementations and logging setup for the `quire` binary.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (build, clean)
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use quire::cmd;
//!
//! // Build the site described by quire.toml
//! cmd::build::run(Path::new("quire.toml"), None).unwrap();
//! ```

use std::path::{Path, PathBuf};

pub mod cmd;

pub use quire_core::Config;
pub use quire_generator::{BuildStats, Builder};

/// Initialize tracing with the specified verbosity level.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

/// Site root for a config file: the directory containing it.
#[must_use]
pub fn site_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
