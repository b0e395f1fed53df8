//! Site configuration management.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Main configuration structure for Quire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Site-wide settings.
    pub site: SiteConfig,

    /// Build settings.
    #[serde(default)]
    pub build: BuildConfig,

    /// External math renderer settings.
    #[serde(default)]
    pub math: MathConfig,

    /// Top-level menu pages, in display order.
    #[serde(default = "default_menu")]
    pub menu: Vec<MenuEntry>,
}

/// Site-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site title.
    pub title: String,

    /// Site description, used for meta tags and the RSS channel.
    #[serde(default)]
    pub description: String,

    /// Canonical URL for the site (e.g., "https://example.com").
    pub url: String,

    /// Separator placed between the site title and a page title.
    #[serde(default = "default_title_divisor")]
    pub title_divisor: String,

    /// Language code reported in the RSS channel.
    #[serde(default = "default_language")]
    pub language: String,
}

/// Build configuration. Directories are relative to the site root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Directory holding one subdirectory per post.
    #[serde(default = "default_posts_dir")]
    pub posts_dir: String,

    /// Directory holding one subdirectory per sketch.
    #[serde(default = "default_sketches_dir")]
    pub sketches_dir: String,

    /// Directory holding one subdirectory per game.
    #[serde(default = "default_games_dir")]
    pub games_dir: String,

    /// Directory holding `template.html`, `load_more.html` and static page sources.
    #[serde(default = "default_template_dir")]
    pub template_dir: String,

    /// Output directory for generated pages and feeds.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Number of post links per index page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Script that fetches further index pages on the client.
    #[serde(default = "default_load_more_script")]
    pub load_more_script: String,
}

/// External math renderer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MathConfig {
    /// Program and arguments of the batch renderer.
    #[serde(default = "default_math_command")]
    pub command: Vec<String>,

    /// Seconds to wait for the renderer before giving up.
    #[serde(default = "default_math_timeout")]
    pub timeout_secs: u64,
}

/// What a menu page is generated from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuKind {
    /// The paginated post index.
    Home,
    /// A source file of the same name in the template directory.
    #[default]
    Static,
    /// The list of sketches.
    Sketches,
    /// The list of games.
    Games,
}

/// A top-level page linked from the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    /// Output file name, e.g. `about.html`.
    pub file: String,

    /// Button label and page title.
    pub title: String,

    /// Page source.
    #[serde(default)]
    pub kind: MenuKind,
}

/// File name of the home page.
pub const HOME_FILE: &str = "index.html";

/// Prefix of environment variables overriding config values, as in
/// `QUIRE__BUILD__PAGE_SIZE=5`.
pub const ENV_PREFIX: &str = "QUIRE";

fn env_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

// Default value functions
fn default_title_divisor() -> String {
    " | ".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_posts_dir() -> String {
    "posts".to_string()
}

fn default_sketches_dir() -> String {
    "sketches".to_string()
}

fn default_games_dir() -> String {
    "games".to_string()
}

fn default_template_dir() -> String {
    "template".to_string()
}

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_page_size() -> usize {
    10
}

fn default_load_more_script() -> String {
    "js/loadmore.js".to_string()
}

fn default_math_command() -> Vec<String> {
    vec!["node".to_string(), "katex/render.js".to_string()]
}

fn default_math_timeout() -> u64 {
    60
}

fn default_menu() -> Vec<MenuEntry> {
    vec![MenuEntry {
        file: HOME_FILE.to_string(),
        title: "Home".to_string(),
        kind: MenuKind::Home,
    }]
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            posts_dir: default_posts_dir(),
            sketches_dir: default_sketches_dir(),
            games_dir: default_games_dir(),
            template_dir: default_template_dir(),
            output_dir: default_output_dir(),
            page_size: default_page_size(),
            load_more_script: default_load_more_script(),
        }
    }
}

impl Default for MathConfig {
    fn default() -> Self {
        Self {
            command: default_math_command(),
            timeout_secs: default_math_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            CoreError::config_with_source(
                format!("Failed to parse config file: {}", path.display()),
                e,
            )
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration, letting `QUIRE__SECTION__KEY` environment variables
    /// override file values.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        Self::load_layered(path, env_source())
    }

    /// Load `path` with `env` layered on top of it.
    fn load_layered(path: &Path, env: config::Environment) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(env)
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.site.title.is_empty() {
            return Err(CoreError::config("site.title cannot be empty"));
        }

        if self.site.url.is_empty() {
            return Err(CoreError::config("site.url cannot be empty"));
        }

        if self.site.url.ends_with('/') {
            tracing::warn!("site.url should not have a trailing slash");
        }

        if self.build.page_size == 0 {
            return Err(CoreError::config("build.page_size must be at least 1"));
        }

        if self.math.command.is_empty() {
            return Err(CoreError::config("math.command cannot be empty"));
        }

        let homes: Vec<_> = self
            .menu
            .iter()
            .filter(|entry| entry.kind == MenuKind::Home)
            .collect();
        match homes.as_slice() {
            [home] if home.file == HOME_FILE => {}
            [home] => {
                return Err(CoreError::config(format!(
                    "home menu entry must be {HOME_FILE}, found {}",
                    home.file
                )));
            }
            _ => {
                return Err(CoreError::config(
                    "menu must contain exactly one home entry",
                ));
            }
        }

        let mut files: Vec<_> = self.menu.iter().map(|entry| &entry.file).collect();
        files.sort();
        if let Some(pair) = files.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(CoreError::config(format!(
                "duplicate menu file: {}",
                pair[0]
            )));
        }

        Ok(())
    }

    /// Get the full URL for a path.
    pub fn url_for(&self, path: &str) -> String {
        let base = self.site.url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Title for a page, prefixed with the site title.
    pub fn page_title(&self, title: &str) -> String {
        format!("{}{}{}", self.site.title, self.site.title_divisor, title)
    }

    /// The menu entry of the home page.
    pub fn home(&self) -> Option<&MenuEntry> {
        self.menu.iter().find(|entry| entry.kind == MenuKind::Home)
    }
}
