//! Build orchestration.
//!
//! Coordinates the full site build: load content, render posts, then write
//! the index, tag and menu pages followed by the feeds.

use std::{
    collections::HashSet,
    fmt, fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use chrono::{Datelike, Utc};
use quire_core::{Config, MenuKind, Post};
use thiserror::Error;
use tracing::{debug, info, info_span};

use crate::{
    collector::{CollectorError, ContentRepository, SiteContent},
    html::{HtmlError, HtmlGenerator, PostLink},
    math::{CommandRenderer, MathError, MathRenderer, render_math},
    pagination::{Neighbors, neighbors, page_file_name, paginate},
    rss::{RssError, RssGenerator},
    sitemap::{SitemapError, SitemapGenerator},
    taxonomy::{TagIndex, tag_file_name},
    template::{Template, TemplateError},
};

/// Page template, in the template directory.
pub const TEMPLATE_FILE: &str = "template.html";

/// Snippet placed under the first index page when more pages follow.
pub const LOAD_MORE_FILE: &str = "load_more.html";

/// Sitemap output file.
pub const SITEMAP_FILE: &str = "sitemap.xml";

/// RSS output file.
pub const RSS_FILE: &str = "rss.xml";

/// Build errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Collector error.
    #[error("collector error: {0}")]
    Collector(#[from] CollectorError),

    /// Template parsing error.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// HTML generation error.
    #[error("HTML error: {0}")]
    Html(#[from] HtmlError),

    /// Math rendering error.
    #[error("math error: {0}")]
    Math(#[from] MathError),

    /// RSS generation error.
    #[error("RSS error: {0}")]
    Rss(#[from] RssError),

    /// Sitemap generation error.
    #[error("sitemap error: {0}")]
    Sitemap(#[from] SitemapError),

    /// A template or static page source is missing.
    #[error("missing template asset: {}", .0.display())]
    MissingTemplateAsset(PathBuf),

    /// A post would overwrite a generated page.
    #[error("post {directory} produces {file}, which is a generated page")]
    FileNameCollision { file: String, directory: String },

    /// A tag page would overwrite a menu page.
    #[error("tag {tag} produces {file}, which is a menu page")]
    TagPageCollision { file: String, tag: String },

    /// `build_single` was given a name no post produces.
    #[error("no post produces {0}")]
    UnknownTarget(String),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Build statistics.
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    /// Number of post pages generated.
    pub posts: usize,

    /// Number of index pages holding post links. The home page is written
    /// even when this is zero.
    pub index_pages: usize,

    /// Number of tag pages generated.
    pub tag_pages: usize,

    /// Number of menu pages generated, the home page excluded.
    pub menu_pages: usize,

    /// Build duration in milliseconds.
    pub duration_ms: u64,
}

/// Template sources read by the pre-flight check.
struct TemplateAssets {
    template: Template,
    load_more: String,
    static_pages: Vec<(String, String, String)>,
}

/// Site builder that orchestrates the build process.
pub struct Builder {
    config: Config,
    root: PathBuf,
    output_dir: PathBuf,
    renderer: Box<dyn MathRenderer>,
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("root", &self.root)
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

impl Builder {
    /// Create a builder for the site rooted at `root`, rendering math with
    /// the configured command.
    #[must_use]
    pub fn new(config: Config, root: impl Into<PathBuf>) -> Self {
        let renderer = CommandRenderer::new(
            &config.math.command,
            Duration::from_secs(config.math.timeout_secs),
        );
        let root = root.into();

        Self {
            output_dir: root.join(&config.build.output_dir),
            config,
            root,
            renderer: Box::new(renderer),
        }
    }

    /// Replace the math renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: impl MathRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Directory generated files are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Execute the full build process.
    pub fn build(&self) -> Result<BuildStats> {
        let start = Instant::now();
        let mut stats = BuildStats::default();

        info!(
            root = %self.root.display(),
            output = %self.output_dir.display(),
            "starting build"
        );

        // 1. Check every template source before touching the output
        let assets = self.load_template_assets()?;

        // 2. Load content
        let content = ContentRepository::new(&self.config, &self.root).load()?;

        // 3. Posts must not overwrite generated pages
        self.check_collisions(&content.posts)?;

        // 4. Remove output of the previous build
        fs::create_dir_all(&self.output_dir)?;
        self.clean()?;

        let html = HtmlGenerator::new(
            self.config.clone(),
            assets.template,
            assets.load_more,
            Utc::now().year(),
        );

        // 5. Render every post
        stats.posts = self.generate_posts(&html, &content.posts)?;

        // 6. Post links shared by index and tag pages
        let links = html.post_links(&content.posts);

        // 7. Index pages
        stats.index_pages = self.generate_index_pages(&html, &links)?;

        // 8. Tag pages
        stats.tag_pages = self.generate_tag_pages(&html, &links)?;

        // 9. Menu pages
        stats.menu_pages = self.generate_menu_pages(&html, &content, &assets.static_pages)?;

        // 10. Feeds
        self.generate_feeds(&content.posts)?;

        stats.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            posts = stats.posts,
            index_pages = stats.index_pages,
            tag_pages = stats.tag_pages,
            menu_pages = stats.menu_pages,
            duration_ms = stats.duration_ms,
            "build complete"
        );

        Ok(stats)
    }

    /// Render only the post producing `file_name`. Its neighbor links still
    /// point at the posts adjacent to it in the full list.
    pub fn build_single(&self, file_name: &str) -> Result<PathBuf> {
        let assets = self.load_template_assets()?;
        let content = ContentRepository::new(&self.config, &self.root).load()?;
        self.check_collisions(&content.posts)?;

        let (index, post) = content
            .post_by_file_name(file_name)
            .ok_or_else(|| BuildError::UnknownTarget(file_name.to_string()))?;
        let links = neighbors(&content.posts);

        let html = HtmlGenerator::new(
            self.config.clone(),
            assets.template,
            assets.load_more,
            Utc::now().year(),
        );

        fs::create_dir_all(&self.output_dir)?;
        self.generate_post(&html, post, &links[index])?;

        let path = self.output_dir.join(file_name);
        info!(path = %path.display(), "single post built");
        Ok(path)
    }

    /// Remove generated files from the output directory: every top-level
    /// `.html` file plus the sitemap and RSS feed. Returns the number of
    /// files removed.
    pub fn clean(&self) -> Result<usize> {
        if !self.output_dir.is_dir() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in fs::read_dir(&self.output_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let path = entry.path();
            let is_html = path.extension().is_some_and(|ext| ext == "html");
            let is_feed = path
                .file_name()
                .is_some_and(|name| name == SITEMAP_FILE || name == RSS_FILE);
            if is_html || is_feed {
                debug!(path = %path.display(), "removing generated file");
                fs::remove_file(&path)?;
                removed += 1;
            }
        }

        info!(removed, dir = %self.output_dir.display(), "cleaned output");
        Ok(removed)
    }

    fn template_path(&self, file: &str) -> PathBuf {
        self.root.join(&self.config.build.template_dir).join(file)
    }

    fn read_template_asset(&self, file: &str) -> Result<String> {
        let path = self.template_path(file);
        if !path.is_file() {
            return Err(BuildError::MissingTemplateAsset(path));
        }
        Ok(fs::read_to_string(path)?)
    }

    /// Read the page template, the load-more snippet and every static page
    /// source.
    fn load_template_assets(&self) -> Result<TemplateAssets> {
        let template = Template::new(self.read_template_asset(TEMPLATE_FILE)?)?;
        let load_more = self.read_template_asset(LOAD_MORE_FILE)?;

        let static_pages = self
            .config
            .menu
            .iter()
            .filter(|entry| entry.kind == MenuKind::Static)
            .map(|entry| -> Result<(String, String, String)> {
                let source = self.read_template_asset(&entry.file)?;
                Ok((entry.file.clone(), entry.title.clone(), source))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TemplateAssets {
            template,
            load_more,
            static_pages,
        })
    }

    /// Fail if a tag page matches a menu or index page, or a post's output
    /// file matches any generated page.
    fn check_collisions(&self, posts: &[Post]) -> Result<()> {
        let page_count = posts.len().div_ceil(self.config.build.page_size.max(1)).max(1);
        let mut generated: HashSet<String> = self
            .config
            .menu
            .iter()
            .map(|entry| entry.file.clone())
            .chain((0..page_count).map(page_file_name))
            .collect();

        let tag_files: Vec<(String, &String)> = posts
            .iter()
            .flat_map(|post| &post.tags)
            .map(|tag| (tag_file_name(tag), tag))
            .collect();
        if let Some((file, tag)) = tag_files.iter().find(|(file, _)| generated.contains(file)) {
            return Err(BuildError::TagPageCollision {
                file: file.clone(),
                tag: (*tag).clone(),
            });
        }
        generated.extend(tag_files.into_iter().map(|(file, _)| file));

        for post in posts {
            let file = post.file_name();
            if generated.contains(&file) {
                return Err(BuildError::FileNameCollision {
                    file,
                    directory: post.directory.clone(),
                });
            }
        }
        Ok(())
    }

    fn generate_posts(&self, html: &HtmlGenerator, posts: &[Post]) -> Result<usize> {
        info!(count = posts.len(), "generating post pages");

        for (post, links) in posts.iter().zip(neighbors(posts)) {
            self.generate_post(html, post, &links)?;
        }
        Ok(posts.len())
    }

    fn generate_post(&self, html: &HtmlGenerator, post: &Post, links: &Neighbors<'_>) -> Result<()> {
        let file = post.file_name();
        let _span = info_span!("post", file = %file).entered();

        let content = render_math(&post.content, self.renderer.as_ref())?;
        let page = html.generate_post(post, &content, links)?;
        self.write_output(&file, &page)
    }

    fn generate_index_pages(&self, html: &HtmlGenerator, links: &[PostLink<'_>]) -> Result<usize> {
        let pages = paginate(links, self.config.build.page_size);
        let total = pages.len().max(1);
        let _span = info_span!("index", pages = total).entered();

        let first = pages.first().copied().unwrap_or_default();
        self.write_output(&page_file_name(0), &html.generate_index(first, total)?)?;

        for (i, page) in pages.iter().enumerate().skip(1) {
            self.write_output(&page_file_name(i), &html.generate_index_continuation(page))?;
        }
        Ok(pages.len())
    }

    fn generate_tag_pages(&self, html: &HtmlGenerator, links: &[PostLink<'_>]) -> Result<usize> {
        let index = TagIndex::build(links);
        let _span = info_span!("tags", count = index.len()).entered();

        for (file, page) in index.iter() {
            self.write_output(file, &html.generate_tag_page(page.label, &page.links)?)?;
        }
        Ok(index.len())
    }

    fn generate_menu_pages(
        &self,
        html: &HtmlGenerator,
        content: &SiteContent,
        static_pages: &[(String, String, String)],
    ) -> Result<usize> {
        let _span = info_span!("menu").entered();
        let mut count = 0;

        for entry in &self.config.menu {
            let body = match entry.kind {
                MenuKind::Home => continue,
                MenuKind::Static => static_pages
                    .iter()
                    .find(|(file, _, _)| *file == entry.file)
                    .map(|(_, _, source)| source.clone())
                    .unwrap_or_default(),
                MenuKind::Sketches => content.sketches.iter().map(|s| html.sketch(s)).collect(),
                MenuKind::Games => content.games.iter().map(|g| html.game(g)).collect(),
            };

            self.write_output(
                &entry.file,
                &html.generate_menu_page(&entry.file, &entry.title, &body)?,
            )?;
            count += 1;
        }
        Ok(count)
    }

    fn generate_feeds(&self, posts: &[Post]) -> Result<()> {
        let mut sitemap = fs::File::create(self.output_dir.join(SITEMAP_FILE))?;
        SitemapGenerator::new(self.config.clone()).write_to(posts, &mut sitemap)?;

        let mut rss = fs::File::create(self.output_dir.join(RSS_FILE))?;
        RssGenerator::new(self.config.clone()).write_to(posts, &mut rss)?;

        debug!("wrote feeds");
        Ok(())
    }

    fn write_output(&self, file: &str, contents: &str) -> Result<()> {
        let path = self.output_dir.join(file);
        fs::write(&path, contents)?;
        debug!(path = %path.display(), "wrote page");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    const TEMPLATE: &str = "<title>$title$</title>$description$$additional-meta$$additional-css$\
<nav>$menu-buttons$</nav><main>$content$</main>$content-footer$$post-script$<p>$year$</p>";

    fn test_config() -> Config {
        toml::from_str(
            r#"
[site]
title = "Test"
url = "https://example.com"

[[menu]]
file = "index.html"
title = "Blog"
kind = "home"

[[menu]]
file = "about.html"
title = "About"
"#,
        )
        .unwrap()
    }

    fn write_templates(root: &Path) {
        let dir = root.join("template");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(TEMPLATE_FILE), TEMPLATE).unwrap();
        fs::write(dir.join(LOAD_MORE_FILE), "<button>more</button>").unwrap();
        fs::write(dir.join("about.html"), "<p>about me</p>").unwrap();
    }

    fn write_post(root: &Path, directory: &str, title: &str) {
        write_tagged_post(root, directory, title, &[]);
    }

    fn write_tagged_post(root: &Path, directory: &str, title: &str, tags: &[&str]) {
        let dir = root.join("posts").join(directory);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("content.html"), "<p>hello</p>").unwrap();
        fs::write(
            dir.join("properties.json"),
            json!({"title": title, "abstract": "x", "preview": "p.png", "tags": tags}).to_string(),
        )
        .unwrap();
    }

    #[test]
    fn test_missing_template_writes_nothing() {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "2020_1_1", "Post");

        let err = Builder::new(test_config(), dir.path()).build().unwrap_err();

        assert!(matches!(err, BuildError::MissingTemplateAsset(ref p) if p.ends_with(TEMPLATE_FILE)));
        assert!(!dir.path().join("post.html").exists());
        assert!(!dir.path().join("index.html").exists());
    }

    #[test]
    fn test_missing_static_page_source() {
        let dir = TempDir::new().unwrap();
        write_templates(dir.path());
        fs::remove_file(dir.path().join("template/about.html")).unwrap();

        let err = Builder::new(test_config(), dir.path()).build().unwrap_err();
        assert!(matches!(err, BuildError::MissingTemplateAsset(ref p) if p.ends_with("about.html")));
    }

    #[test]
    fn test_collision_with_menu_page() {
        let dir = TempDir::new().unwrap();
        write_templates(dir.path());
        write_post(dir.path(), "2020_1_1", "About");

        let err = Builder::new(test_config(), dir.path()).build().unwrap_err();
        assert!(matches!(err, BuildError::FileNameCollision { ref file, .. } if file == "about.html"));
    }

    #[test]
    fn test_tag_page_collision_with_menu_page() {
        let dir = TempDir::new().unwrap();
        write_templates(dir.path());
        fs::write(dir.path().join("template/tag_news.html"), "<p>news</p>").unwrap();
        write_tagged_post(dir.path(), "2020_1_1", "Post", &["News"]);
        let mut config = test_config();
        config.menu[1].file = "tag_news.html".to_string();

        let err = Builder::new(config, dir.path()).build().unwrap_err();

        assert!(matches!(
            err,
            BuildError::TagPageCollision { ref file, ref tag } if file == "tag_news.html" && tag == "News"
        ));
        assert!(!dir.path().join("index.html").exists());
        assert!(!dir.path().join("post.html").exists());
    }

    #[test]
    fn test_tag_spellings_share_one_page() {
        let dir = TempDir::new().unwrap();
        write_templates(dir.path());
        write_tagged_post(dir.path(), "2021_1_1", "Upper", &["WebGL"]);
        write_tagged_post(dir.path(), "2020_1_1", "Lower", &["webgl"]);

        let stats = Builder::new(test_config(), dir.path()).build().unwrap();

        assert_eq!(stats.tag_pages, 1);
        let page = fs::read_to_string(dir.path().join("tag_webgl.html")).unwrap();
        assert!(page.contains(r#"href="upper.html""#));
        assert!(page.contains(r#"href="lower.html""#));
        assert!(page.contains("<title>Test | WebGL</title>"));
    }

    #[test]
    fn test_build_writes_menu_pages() {
        let dir = TempDir::new().unwrap();
        write_templates(dir.path());
        write_post(dir.path(), "2020_1_1", "Post");

        let stats = Builder::new(test_config(), dir.path()).build().unwrap();

        assert_eq!(stats.posts, 1);
        assert_eq!(stats.index_pages, 1);
        assert_eq!(stats.menu_pages, 1);
        let about = fs::read_to_string(dir.path().join("about.html")).unwrap();
        assert!(about.contains("<p>about me</p>"));
        assert!(about.contains("<title>Test | About</title>"));
    }

    #[test]
    fn test_clean_keeps_other_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "").unwrap();
        fs::write(dir.path().join("old_post.html"), "").unwrap();
        fs::write(dir.path().join(SITEMAP_FILE), "").unwrap();
        fs::write(dir.path().join(RSS_FILE), "").unwrap();
        fs::write(dir.path().join("quire.toml"), "").unwrap();
        fs::create_dir_all(dir.path().join("posts")).unwrap();
        fs::write(dir.path().join("posts/keep.html"), "").unwrap();

        let removed = Builder::new(test_config(), dir.path()).clean().unwrap();

        assert_eq!(removed, 4);
        assert!(dir.path().join("quire.toml").exists());
        assert!(dir.path().join("posts/keep.html").exists());
        assert!(!dir.path().join("index.html").exists());
    }

    #[test]
    fn test_clean_missing_output_dir() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config();
        config.build.output_dir = "public".to_string();

        assert_eq!(Builder::new(config, dir.path()).clean().unwrap(), 0);
    }

    #[test]
    fn test_build_single_unknown_target() {
        let dir = TempDir::new().unwrap();
        write_templates(dir.path());
        write_post(dir.path(), "2020_1_1", "Post");

        let err = Builder::new(test_config(), dir.path())
            .build_single("missing.html")
            .unwrap_err();
        assert!(matches!(err, BuildError::UnknownTarget(ref name) if name == "missing.html"));
    }

    #[test]
    fn test_build_single_rejects_collision() {
        let dir = TempDir::new().unwrap();
        write_templates(dir.path());
        write_post(dir.path(), "2020_1_1", "About");

        let err = Builder::new(test_config(), dir.path())
            .build_single("about.html")
            .unwrap_err();

        assert!(matches!(err, BuildError::FileNameCollision { ref file, .. } if file == "about.html"));
        assert!(!dir.path().join("about.html").exists());
    }
}
