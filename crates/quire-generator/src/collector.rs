//! Content collection and organization.
//!
//! Scans the posts, sketches and games directories and loads every entry into
//! memory in its canonical order.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use quire_core::{
    Config, CoreError, Game, Post, Sketch,
    properties::{PROPERTIES_FILE, read_properties},
};
use thiserror::Error;
use tracing::{debug, info, info_span};
use walkdir::WalkDir;

/// Content file of every post.
pub const CONTENT_FILE: &str = "content.html";

/// Post subdirectory holding stylesheets.
pub const CSS_DIR: &str = "css";

/// Post subdirectory holding scripts.
pub const JS_DIR: &str = "js";

/// Directories starting with this prefix are drafts and never published.
pub const DRAFT_PREFIX: char = '_';

/// Content collection errors.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A required content or metadata file is missing.
    #[error("missing asset: {}", .0.display())]
    MissingAsset(PathBuf),

    /// Metadata could not be parsed or the directory name is not a date.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Two posts derive the same output file name.
    #[error("posts {first} and {second} both produce {file}")]
    DuplicateFileName {
        file: String,
        first: String,
        second: String,
    },

    /// Walking an asset directory failed.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Result type for collector operations.
pub type Result<T> = std::result::Result<T, CollectorError>;

/// Everything loaded from the content directories.
#[derive(Debug, Default)]
pub struct SiteContent {
    /// Posts, most recent first.
    pub posts: Vec<Post>,

    /// Sketches, most recent first.
    pub sketches: Vec<Sketch>,

    /// Games, by directory name.
    pub games: Vec<Game>,
}

impl SiteContent {
    /// Find a post by its output file name.
    #[must_use]
    pub fn post_by_file_name(&self, file_name: &str) -> Option<(usize, &Post)> {
        self.posts
            .iter()
            .enumerate()
            .find(|(_, post)| post.file_name() == file_name)
    }
}

/// Loads posts, sketches and games from a site root.
#[derive(Debug)]
pub struct ContentRepository {
    posts_dir: PathBuf,
    sketches_dir: PathBuf,
    games_dir: PathBuf,
}

impl ContentRepository {
    /// Create a repository for the directories configured under `root`.
    #[must_use]
    pub fn new(config: &Config, root: &Path) -> Self {
        Self {
            posts_dir: root.join(&config.build.posts_dir),
            sketches_dir: root.join(&config.build.sketches_dir),
            games_dir: root.join(&config.build.games_dir),
        }
    }

    /// Load all content.
    pub fn load(&self) -> Result<SiteContent> {
        let content = SiteContent {
            posts: self.load_posts()?,
            sketches: self.load_sketches()?,
            games: self.load_games()?,
        };

        info!(
            posts = content.posts.len(),
            sketches = content.sketches.len(),
            games = content.games.len(),
            "content collection complete"
        );

        Ok(content)
    }

    /// Load every published post, most recent first.
    pub fn load_posts(&self) -> Result<Vec<Post>> {
        let _span = info_span!("posts", dir = %self.posts_dir.display()).entered();

        let mut posts = Vec::new();
        for (name, dir) in entry_directories(&self.posts_dir)? {
            posts.push(load_post(&name, &dir)?);
        }
        posts.sort_by(Post::chronological_desc);

        ensure_unique_file_names(&posts)?;

        info!(count = posts.len(), "loaded posts");
        Ok(posts)
    }

    /// Load every published sketch, most recent first.
    pub fn load_sketches(&self) -> Result<Vec<Sketch>> {
        let _span = info_span!("sketches", dir = %self.sketches_dir.display()).entered();

        let mut sketches = Vec::new();
        for (name, dir) in entry_directories(&self.sketches_dir)? {
            let properties = read_properties(&required_file(&dir, PROPERTIES_FILE)?)?;
            sketches.push(Sketch::new(name, properties)?);
        }
        sketches.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.directory.cmp(&a.directory))
        });

        info!(count = sketches.len(), "loaded sketches");
        Ok(sketches)
    }

    /// Load every published game, ordered by directory name.
    pub fn load_games(&self) -> Result<Vec<Game>> {
        let _span = info_span!("games", dir = %self.games_dir.display()).entered();

        let mut games = Vec::new();
        for (name, dir) in entry_directories(&self.games_dir)? {
            let properties = read_properties(&required_file(&dir, PROPERTIES_FILE)?)?;
            games.push(Game::new(name, properties));
        }
        games.sort_by(|a, b| a.directory.cmp(&b.directory));

        info!(count = games.len(), "loaded games");
        Ok(games)
    }
}

/// Load one post directory.
fn load_post(name: &str, dir: &Path) -> Result<Post> {
    debug!(directory = name, "loading post");

    let content_path = required_file(dir, CONTENT_FILE)?;
    let properties_path = required_file(dir, PROPERTIES_FILE)?;

    let properties = read_properties(&properties_path)?;
    let content = fs::read_to_string(&content_path)?;

    let mut post = Post::new(name, properties, content)?;
    post.css = asset_files(dir, CSS_DIR)?;
    post.js = asset_files(dir, JS_DIR)?;

    Ok(post)
}

/// Published entry directories below `root`, as `(name, path)` pairs.
///
/// A missing root has no entries. Plain files and drafts are skipped.
fn entry_directories(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !root.is_dir() {
        debug!(dir = %root.display(), "content directory does not exist");
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with(DRAFT_PREFIX) {
            debug!(directory = %name, "skipping draft");
            continue;
        }

        entries.push((name, entry.path()));
    }

    entries.sort();
    Ok(entries)
}

/// Path of a file that must exist in `dir`.
fn required_file(dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(CollectorError::MissingAsset(path))
    }
}

/// Files below `dir/subdir`, relative to `dir`, with `/` separators, sorted.
fn asset_files(dir: &Path, subdir: &str) -> Result<Vec<String>> {
    let root = dir.join(subdir);
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push(relative);
    }

    Ok(files)
}

fn ensure_unique_file_names(posts: &[Post]) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for post in posts {
        let file = post.file_name();
        if let Some(first) = seen.insert(file.clone(), &post.directory) {
            return Err(CollectorError::DuplicateFileName {
                file,
                first: first.to_string(),
                second: post.directory.clone(),
            });
        }
    }
    Ok(())
}
