//! Metadata sidecars (`properties.json`) for posts, sketches and games.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// File name of every metadata sidecar.
pub const PROPERTIES_FILE: &str = "properties.json";

/// Sidecar metadata of a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostProperties {
    /// Post title, also the source of the output file name.
    pub title: String,

    /// Short summary shown in post links and feeds.
    #[serde(rename = "abstract")]
    pub summary: String,

    /// Preview image, relative to the post directory.
    pub preview: String,

    /// Tags in display order. Absent means no tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Sidecar metadata shared by sketches and games.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryProperties {
    /// Entry title.
    pub title: String,

    /// Where the sketch or game is hosted.
    pub url: String,

    /// One-paragraph description.
    pub description: String,

    /// Preview image, relative to the entry directory.
    pub preview: String,

    /// Link to the source code, if published.
    #[serde(default)]
    pub source: Option<String>,
}

/// Parse a sidecar from its JSON text. `path` is only used for error reporting.
pub fn parse_properties<T>(json: &str, path: &Path) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_str(json).map_err(|e| CoreError::malformed(path, e.to_string()))
}

/// Read and parse the sidecar at `path`.
pub fn read_properties<T>(path: &Path) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let json = std::fs::read_to_string(path)?;
    parse_properties(&json, path)
}
