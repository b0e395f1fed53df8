//! Content types and structures.

use std::{cmp::Ordering, fmt};

use chrono::{Datelike, NaiveDate};

use crate::{
    error::{CoreError, Result},
    properties::{EntryProperties, PostProperties},
};

/// Publication date encoded in a content directory name.
///
/// Directory names look like `<year>_<month>_<day>[_label]`, e.g. `2019_1_7`
/// or `2020_02_01_part_two`. The date is parsed once at load time; ordering
/// and feed dates always use this value, never the directory string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PostDate(NaiveDate);

impl PostDate {
    /// Create a date from its components.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Parse the date prefix of a directory name.
    pub fn from_directory_name(name: &str) -> Result<Self> {
        let mut parts = name.splitn(4, '_');
        let mut next_number = || -> Option<u32> {
            let part = parts.next()?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            part.parse().ok()
        };

        let (Some(year), Some(month), Some(day)) = (next_number(), next_number(), next_number())
        else {
            return Err(CoreError::InvalidDate(name.to_string()));
        };

        i32::try_from(year)
            .ok()
            .and_then(|year| Self::from_ymd(year, month, day))
            .ok_or_else(|| CoreError::InvalidDate(name.to_string()))
    }

    /// The underlying calendar date.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    #[must_use]
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    #[must_use]
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    #[must_use]
    pub fn day(&self) -> u32 {
        self.0.day()
    }
}

impl fmt::Display for PostDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Derive a file-name slug: lowercase, spaces replaced by underscores.
#[must_use]
pub fn slugify(text: &str) -> String {
    text.to_lowercase().replace(' ', "_")
}

/// A blog post loaded from `posts/<date-directory>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Name of the source directory, e.g. `2021_2_11`.
    pub directory: String,

    /// Publication date parsed from the directory name.
    pub date: PostDate,

    pub title: String,

    /// Short summary shown in post links and feeds.
    pub summary: String,

    /// Preview image, relative to the post directory.
    pub preview: String,

    /// Raw HTML content fragment.
    pub content: String,

    /// Tags in display order.
    pub tags: Vec<String>,

    /// Stylesheets, relative to the post directory (e.g. `css/plot.css`).
    pub css: Vec<String>,

    /// Scripts, relative to the post directory (e.g. `js/main.js`).
    pub js: Vec<String>,
}

impl Post {
    /// Assemble a post from its directory name, sidecar and content.
    pub fn new(
        directory: impl Into<String>,
        properties: PostProperties,
        content: String,
    ) -> Result<Self> {
        let directory = directory.into();
        let date = PostDate::from_directory_name(&directory)?;

        Ok(Self {
            directory,
            date,
            title: properties.title,
            summary: properties.summary,
            preview: properties.preview,
            content,
            tags: properties.tags,
            css: Vec::new(),
            js: Vec::new(),
        })
    }

    /// Output file name derived from the title.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.html", slugify(&self.title))
    }

    /// Whether the post carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Canonical post order: most recent first, same-date posts by directory
    /// name descending.
    #[must_use]
    pub fn chronological_desc(a: &Self, b: &Self) -> Ordering {
        b.date
            .cmp(&a.date)
            .then_with(|| b.directory.cmp(&a.directory))
    }
}

/// A sketch loaded from `sketches/<date-directory>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sketch {
    pub directory: String,
    pub date: PostDate,
    pub title: String,
    pub url: String,
    pub description: String,
    pub preview: String,
    pub source: Option<String>,
}

impl Sketch {
    /// Assemble a sketch from its directory name and sidecar.
    pub fn new(directory: impl Into<String>, properties: EntryProperties) -> Result<Self> {
        let directory = directory.into();
        let date = PostDate::from_directory_name(&directory)?;

        Ok(Self {
            directory,
            date,
            title: properties.title,
            url: properties.url,
            description: properties.description,
            preview: properties.preview,
            source: properties.source,
        })
    }
}

/// A game loaded from `games/<name>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub directory: String,
    pub title: String,
    pub url: String,
    pub description: String,
    pub preview: String,
    pub source: Option<String>,
}

impl Game {
    /// Assemble a game from its directory name and sidecar.
    #[must_use]
    pub fn new(directory: impl Into<String>, properties: EntryProperties) -> Self {
        Self {
            directory: directory.into(),
            title: properties.title,
            url: properties.url,
            description: properties.description,
            preview: properties.preview,
            source: properties.source,
        }
    }
}
