//! RSS feed generation.
//!
//! Generates an RSS 2.0 feed listing every post, most recent first.

use std::io::Write;

use chrono::Datelike;
use quire_core::{Config, Post, PostDate};
use rss::{ChannelBuilder, GuidBuilder, Item, ItemBuilder};
use thiserror::Error;
use tracing::debug;

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// RSS generation errors.
#[derive(Debug, Error)]
pub enum RssError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for RSS operations.
pub type Result<T> = std::result::Result<T, RssError>;

/// Publication date of a post in RFC 822 form. Posts carry no time of day,
/// so every date is published at midnight UTC.
#[must_use]
pub fn pub_date(date: PostDate) -> String {
    let date = date.date();
    // Both indices are in range by construction of `NaiveDate`.
    let weekday = WEEKDAYS[date.weekday().num_days_from_monday() as usize];
    let month = MONTHS[date.month0() as usize];
    format!(
        "{weekday}, {:02} {month} {} 00:00:00 +0000",
        date.day(),
        date.year()
    )
}

/// RSS feed generator.
#[derive(Debug)]
pub struct RssGenerator {
    config: Config,
}

impl RssGenerator {
    /// Create a new RSS generator.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Generate RSS feed XML from posts ordered most recent first.
    #[must_use]
    pub fn generate(&self, posts: &[Post]) -> String {
        debug!(count = posts.len(), "generating RSS feed");

        let items: Vec<Item> = posts.iter().map(|post| self.post_to_item(post)).collect();

        let channel = ChannelBuilder::default()
            .title(&self.config.site.title)
            .link(&self.config.site.url)
            .description(&self.config.site.description)
            .language(Some(self.config.site.language.clone()))
            .last_build_date(posts.first().map(|post| pub_date(post.date)))
            .items(items)
            .build();

        channel.to_string()
    }

    fn post_to_item(&self, post: &Post) -> Item {
        let url = self.config.url_for(&post.file_name());
        let guid = GuidBuilder::default().value(&url).permalink(true).build();

        let categories: Vec<_> = post
            .tags
            .iter()
            .map(|tag| rss::Category {
                name: tag.clone(),
                domain: None,
            })
            .collect();

        ItemBuilder::default()
            .title(Some(post.title.clone()))
            .link(Some(url))
            .guid(Some(guid))
            .description(Some(post.summary.clone()))
            .pub_date(Some(pub_date(post.date)))
            .categories(categories)
            .build()
    }

    /// Write the RSS feed to a writer.
    pub fn write_to<W: Write>(&self, posts: &[Post], writer: &mut W) -> Result<()> {
        writer.write_all(self.generate(posts).as_bytes())?;
        Ok(())
    }
}
