//! Sitemap generation.
//!
//! Lists the menu pages first, then every post.

use std::io::Write;

use chrono::NaiveDate;
use quire_core::{Config, MenuKind, Post};
use thiserror::Error;
use tracing::debug;

/// Sitemap generation errors.
#[derive(Debug, Error)]
pub enum SitemapError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sitemap operations.
pub type Result<T> = std::result::Result<T, SitemapError>;

/// Change frequency for sitemap entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFreq {
    Daily,
    Monthly,
    Yearly,
}

impl ChangeFreq {
    fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

/// A sitemap URL entry.
#[derive(Debug, Clone)]
pub struct SitemapUrl {
    pub loc: String,
    pub lastmod: Option<NaiveDate>,
    pub changefreq: ChangeFreq,
    pub priority: f32,
}

/// Sitemap generator.
#[derive(Debug)]
pub struct SitemapGenerator {
    config: Config,
}

impl SitemapGenerator {
    /// Create a new sitemap generator.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// All entries in output order.
    #[must_use]
    pub fn urls(&self, posts: &[Post]) -> Vec<SitemapUrl> {
        let pages = self.config.menu.iter().map(|entry| {
            let (changefreq, priority) = match entry.kind {
                MenuKind::Home => (ChangeFreq::Daily, 1.0),
                _ => (ChangeFreq::Monthly, 0.5),
            };
            SitemapUrl {
                loc: self.config.url_for(&entry.file),
                lastmod: None,
                changefreq,
                priority,
            }
        });

        let posts = posts.iter().map(|post| SitemapUrl {
            loc: self.config.url_for(&post.file_name()),
            lastmod: Some(post.date.date()),
            changefreq: ChangeFreq::Yearly,
            priority: 0.8,
        });

        pages.chain(posts).collect()
    }

    /// Generate sitemap XML.
    #[must_use]
    pub fn generate(&self, posts: &[Post]) -> String {
        let urls = self.urls(posts);
        debug!(count = urls.len(), "generating sitemap");

        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
        xml.push('\n');
        for url in &urls {
            xml.push_str(&url_to_xml(url));
        }
        xml.push_str("</urlset>\n");
        xml
    }

    /// Write the sitemap to a writer.
    pub fn write_to<W: Write>(&self, posts: &[Post], writer: &mut W) -> Result<()> {
        writer.write_all(self.generate(posts).as_bytes())?;
        Ok(())
    }
}

fn url_to_xml(url: &SitemapUrl) -> String {
    let mut xml = String::from("  <url>\n");
    xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&url.loc)));
    if let Some(lastmod) = url.lastmod {
        xml.push_str(&format!(
            "    <lastmod>{}</lastmod>\n",
            lastmod.format("%Y-%m-%d")
        ));
    }
    xml.push_str(&format!(
        "    <changefreq>{}</changefreq>\n",
        url.changefreq.as_str()
    ));
    xml.push_str(&format!("    <priority>{:.1}</priority>\n", url.priority));
    xml.push_str("  </url>\n");
    xml
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
