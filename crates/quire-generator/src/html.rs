//! HTML generation from loaded content.
//!
//! Builds the fragments (post links, tag lists, neighbor navigation, menu
//! buttons) and wraps them in the site template.

use quire_core::{Config, Game, MenuKind, Post, Sketch};
use thiserror::Error;
use tracing::debug;

use crate::{
    pagination::Neighbors,
    taxonomy::tag_file_name,
    template::{Placeholder, Substitutions, Template, TemplateError, compress},
};

/// Attribute prefix marking a reference into the post's own directory, as in
/// `<img src="@figure.png">`.
pub const LOCAL_REF: char = '@';

/// HTML generation errors.
#[derive(Debug, Error)]
pub enum HtmlError {
    /// Template error.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
}

/// Result type for HTML generation.
pub type Result<T> = std::result::Result<T, HtmlError>;

/// A post paired with its rendered link, shared by index and tag pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostLink<'a> {
    pub post: &'a Post,
    pub html: String,
}

fn concat_links(links: &[PostLink<'_>]) -> String {
    links.iter().map(|link| link.html.as_str()).collect()
}

/// HTML page generator.
#[derive(Debug)]
pub struct HtmlGenerator {
    config: Config,
    template: Template,
    load_more: String,
    year: i32,
}

impl HtmlGenerator {
    /// Create a generator around the site template and the load-more snippet.
    /// `year` fills the `$year$` placeholder on every page.
    #[must_use]
    pub fn new(config: Config, template: Template, load_more: impl Into<String>, year: i32) -> Self {
        Self {
            config,
            template,
            load_more: load_more.into(),
            year,
        }
    }

    /// Directory of a post's assets, relative to the site root, with a
    /// trailing slash.
    #[must_use]
    pub fn asset_dir(&self, post: &Post) -> String {
        format!("{}/{}/", self.config.build.posts_dir, post.directory)
    }

    /// The link to a post used on index and tag pages.
    #[must_use]
    pub fn post_link(&self, post: &Post) -> String {
        let file = post.file_name();
        format!(
            r#"<div class="post-link">
<a href="{file}"><img class="preview" src="{dir}{preview}" alt="{title}"></a>
<div class="post-link-text">
<h2><a href="{file}">{title}</a></h2>
<span class="date">{date}</span>
<p>{summary}</p>
{tags}
</div>
</div>
"#,
            dir = self.asset_dir(post),
            preview = post.preview,
            title = post.title,
            date = display_date(post),
            summary = post.summary,
            tags = tags_html(&post.tags),
        )
    }

    /// Links to every post in `posts`, in the same order.
    #[must_use]
    pub fn post_links<'a>(&self, posts: &'a [Post]) -> Vec<PostLink<'a>> {
        posts
            .iter()
            .map(|post| PostLink {
                post,
                html: self.post_link(post),
            })
            .collect()
    }

    /// Render a full post page. `content` is the post body with formulas
    /// already rendered.
    pub fn generate_post(&self, post: &Post, content: &str, neighbors: &Neighbors<'_>) -> Result<String> {
        debug!(file = %post.file_name(), "generating HTML for post");

        let asset_dir = self.asset_dir(post);
        let body = format!(
            r#"<article class="post">
<h1>{title}</h1>
<span class="date">{date}</span>
{tags}
{content}
</article>
"#,
            title = post.title,
            date = display_date(post),
            tags = tags_html(&post.tags),
            content = rewrite_local_refs(content, &asset_dir),
        );

        let subs = self
            .base_substitutions(&self.config.page_title(&post.title), None)
            .with(Placeholder::Description, &post.summary)
            .with(Placeholder::AdditionalCss, css_links(&asset_dir, &post.css))
            .with(Placeholder::PostScript, script_tags(&asset_dir, &post.js))
            .with(Placeholder::Content, body)
            .with(Placeholder::ContentFooter, neighbor_html(neighbors))
            .with(Placeholder::AdditionalMeta, self.post_meta(post));

        Ok(compress(&self.template.render(&subs)?))
    }

    /// Render the home page holding the first index page. `total_pages`
    /// counts every index page including this one.
    pub fn generate_index(&self, links: &[PostLink<'_>], total_pages: usize) -> Result<String> {
        let mut subs = self
            .base_substitutions(&self.config.site.title, Some(MenuKind::Home))
            .with(Placeholder::Content, concat_links(links));

        if total_pages > 1 {
            subs.insert(
                Placeholder::PostScript,
                format!(
                    r#"<script>const pageCount = {total_pages};</script>
<script src="{}"></script>"#,
                    self.config.build.load_more_script
                ),
            );
            subs.insert(Placeholder::ContentFooter, self.load_more.as_str());
        }

        Ok(compress(&self.template.render(&subs)?))
    }

    /// Render an index page after the first. These hold only post links and
    /// are appended to the home page by the load-more script.
    #[must_use]
    pub fn generate_index_continuation(&self, links: &[PostLink<'_>]) -> String {
        compress(&concat_links(links))
    }

    /// Render the listing of posts tagged `tag`.
    pub fn generate_tag_page(&self, tag: &str, links: &[&str]) -> Result<String> {
        let content = format!(
            "<h1 class=\"tag-title\">{tag}</h1>\n{}",
            links.concat()
        );
        let subs = self
            .base_substitutions(&self.config.page_title(tag), Some(MenuKind::Home))
            .with(Placeholder::Content, content);

        Ok(compress(&self.template.render(&subs)?))
    }

    /// Render a top-level menu page with the given content.
    pub fn generate_menu_page(&self, file: &str, title: &str, content: &str) -> Result<String> {
        let mut subs = self
            .base_substitutions(&self.config.page_title(title), None)
            .with(Placeholder::Content, content);
        subs.insert(Placeholder::MenuButtons, self.menu_buttons(Some(file)));

        Ok(compress(&self.template.render(&subs)?))
    }

    /// Menu buttons for every configured menu page, marking `active`.
    #[must_use]
    pub fn menu_buttons(&self, active: Option<&str>) -> String {
        self.config
            .menu
            .iter()
            .map(|entry| {
                let class = if Some(entry.file.as_str()) == active {
                    "menu-button active"
                } else {
                    "menu-button"
                };
                format!(r#"<a class="{class}" href="{}">{}</a>"#, entry.file, entry.title)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Card for one sketch.
    #[must_use]
    pub fn sketch(&self, sketch: &Sketch) -> String {
        entry_card(
            &format!("{}/{}/", self.config.build.sketches_dir, sketch.directory),
            &sketch.title,
            &sketch.url,
            &sketch.description,
            &sketch.preview,
            sketch.source.as_deref(),
        )
    }

    /// Card for one game.
    #[must_use]
    pub fn game(&self, game: &Game) -> String {
        entry_card(
            &format!("{}/{}/", self.config.build.games_dir, game.directory),
            &game.title,
            &game.url,
            &game.description,
            &game.preview,
            game.source.as_deref(),
        )
    }

    /// Open Graph tags for a post page.
    fn post_meta(&self, post: &Post) -> String {
        let mut meta = vec![
            format!(r#"<meta property="og:title" content="{}">"#, post.title),
            format!(r#"<meta property="og:description" content="{}">"#, post.summary),
            format!(
                r#"<meta property="og:url" content="{}">"#,
                self.config.url_for(&post.file_name())
            ),
            format!(
                r#"<meta property="og:image" content="{}">"#,
                self.config
                    .url_for(&format!("{}{}", self.asset_dir(post), post.preview))
            ),
            r#"<meta property="og:type" content="article">"#.to_string(),
        ];
        if !post.tags.is_empty() {
            meta.push(format!(
                r#"<meta name="keywords" content="{}">"#,
                post.tags.join(", ")
            ));
        }
        meta.join("\n")
    }

    /// Substitutions shared by every page. The menu marks the entry of kind
    /// `active`, if any.
    fn base_substitutions(&self, title: &str, active: Option<MenuKind>) -> Substitutions {
        let active_file = active.and_then(|kind| {
            self.config
                .menu
                .iter()
                .find(|entry| entry.kind == kind)
                .map(|entry| entry.file.as_str())
        });

        Substitutions::new()
            .with(Placeholder::Title, title)
            .with(Placeholder::Description, &self.config.site.description)
            .with(Placeholder::AdditionalCss, "")
            .with(Placeholder::PostScript, "")
            .with(Placeholder::MenuButtons, self.menu_buttons(active_file))
            .with(Placeholder::Content, "")
            .with(Placeholder::ContentFooter, "")
            .with(Placeholder::AdditionalMeta, "")
            .with(Placeholder::Year, self.year.to_string())
    }
}

/// Human-readable publication date, e.g. `February 11, 2021`.
fn display_date(post: &Post) -> String {
    post.date.date().format("%B %-d, %Y").to_string()
}

/// Links to the tag pages of `tags`, in display order. Empty without tags.
#[must_use]
pub fn tags_html(tags: &[String]) -> String {
    if tags.is_empty() {
        return String::new();
    }

    let links = tags
        .iter()
        .map(|tag| format!(r#"<a class="tag" href="{}">{tag}</a>"#, tag_file_name(tag)))
        .collect::<Vec<_>>()
        .join("\n");
    format!("<div class=\"tags\">\n{links}\n</div>")
}

/// Navigation to the older and newer post. A missing side renders nothing.
#[must_use]
pub fn neighbor_html(neighbors: &Neighbors<'_>) -> String {
    if neighbors.previous.is_none() && neighbors.next.is_none() {
        return String::new();
    }

    let mut nav = String::from("<div class=\"neighbors\">\n");
    if let Some(previous) = neighbors.previous {
        nav.push_str(&format!(
            "<a class=\"previous\" href=\"{}\">{}</a>\n",
            previous.file_name(),
            previous.title
        ));
    }
    if let Some(next) = neighbors.next {
        nav.push_str(&format!(
            "<a class=\"next\" href=\"{}\">{}</a>\n",
            next.file_name(),
            next.title
        ));
    }
    nav.push_str("</div>");
    nav
}

/// Point `src="@..."` and `href="@..."` attributes at `asset_dir`.
#[must_use]
pub fn rewrite_local_refs(content: &str, asset_dir: &str) -> String {
    content
        .replace(&format!("src=\"{LOCAL_REF}"), &format!("src=\"{asset_dir}"))
        .replace(&format!("href=\"{LOCAL_REF}"), &format!("href=\"{asset_dir}"))
}

/// Stylesheet links for a post's `css/` files.
fn css_links(asset_dir: &str, files: &[String]) -> String {
    files
        .iter()
        .map(|file| format!(r#"<link rel="stylesheet" href="{asset_dir}{file}">"#))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Script tags for a post's `js/` files.
fn script_tags(asset_dir: &str, files: &[String]) -> String {
    files
        .iter()
        .map(|file| format!(r#"<script src="{asset_dir}{file}"></script>"#))
        .collect::<Vec<_>>()
        .join("\n")
}

fn entry_card(
    dir: &str,
    title: &str,
    url: &str,
    description: &str,
    preview: &str,
    source: Option<&str>,
) -> String {
    let source = source
        .map(|href| format!("<a class=\"source\" href=\"{href}\">Source</a>\n"))
        .unwrap_or_default();
    format!(
        r#"<div class="entry">
<a href="{url}"><img class="preview" src="{dir}{preview}" alt="{title}"></a>
<h2><a href="{url}">{title}</a></h2>
<p>{description}</p>
{source}</div>
"#
    )
}
