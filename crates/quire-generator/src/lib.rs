//! Quire Generator Library
//!
//! Static site generation engine for Quire.
//!
//! # Modules
//!
//! - [`template`] - Page template with fixed `$name$` placeholders
//! - [`collector`] - Loading posts, sketches and games from disk
//! - [`math`] - Formula extraction and batch rendering
//! - [`pagination`] - Index pages and post neighbors
//! - [`taxonomy`] - Tag index over rendered post links
//! - [`html`] - HTML fragments and page assembly
//! - [`rss`] - RSS feed generation
//! - [`sitemap`] - XML sitemap generation
//! - [`build`] - Build orchestration

pub mod build;
pub mod collector;
pub mod html;
pub mod math;
pub mod pagination;
pub mod rss;
pub mod sitemap;
pub mod taxonomy;
pub mod template;

pub use build::{BuildError, BuildStats, Builder};
pub use collector::{ContentRepository, SiteContent};
pub use html::{HtmlGenerator, PostLink};
pub use math::{CommandRenderer, Formula, MathError, MathRenderer};
pub use rss::RssGenerator;
pub use sitemap::SitemapGenerator;
pub use taxonomy::TagIndex;
pub use template::{Placeholder, Template};
