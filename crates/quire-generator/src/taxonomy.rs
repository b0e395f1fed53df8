//! Tag index.
//!
//! Groups already-rendered post links by tag. Posts are never rendered again
//! here; each tag page reuses the links produced for the main index.

use std::collections::BTreeMap;

use quire_core::slugify;

use crate::html::PostLink;

/// Prefix that keeps tag page names apart from post page names.
pub const TAG_FILE_PREFIX: &str = "tag_";

/// Output file name of the page listing posts tagged `tag`.
#[must_use]
pub fn tag_file_name(tag: &str) -> String {
    format!("{TAG_FILE_PREFIX}{}.html", slugify(tag))
}

/// One tag page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPage<'a> {
    /// Label shown on the page: the spelling used by the most recent post.
    pub label: &'a str,

    /// Links of the tagged posts, in global post order.
    pub links: Vec<&'a str>,
}

/// Tag pages keyed by output file name.
///
/// Labels that slug to the same file name (`WebGL` and `webgl`) share one
/// page. Pages enumerate in file name order.
#[derive(Debug, Default)]
pub struct TagIndex<'a> {
    pages: BTreeMap<String, TagPage<'a>>,
}

impl<'a> TagIndex<'a> {
    /// Index rendered post links by the tags of their posts.
    #[must_use]
    pub fn build(links: &'a [PostLink<'a>]) -> Self {
        let mut pages: BTreeMap<String, TagPage<'a>> = BTreeMap::new();
        for link in links {
            for tag in &link.post.tags {
                let page = pages.entry(tag_file_name(tag)).or_insert_with(|| TagPage {
                    label: tag,
                    links: Vec::new(),
                });
                // A post listing a tag twice, in any spelling, appears once.
                if page.links.last() != Some(&link.html.as_str()) {
                    page.links.push(&link.html);
                }
            }
        }

        Self { pages }
    }

    /// Number of tag pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// The page listing posts tagged `tag`, in any spelling that maps to the
    /// same file name.
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&TagPage<'a>> {
        self.pages.get(&tag_file_name(tag))
    }

    /// Iterate `(file name, page)` pairs in file name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagPage<'a>)> {
        self.pages.iter().map(|(file, page)| (file.as_str(), page))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use quire_core::{Post, PostProperties};

    use super::*;

    fn post(directory: &str, title: &str, tags: &[&str]) -> Post {
        Post::new(
            directory,
            PostProperties {
                title: title.to_string(),
                summary: String::new(),
                preview: String::new(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
            String::new(),
        )
        .unwrap()
    }

    fn links(posts: &[Post]) -> Vec<PostLink<'_>> {
        posts
            .iter()
            .map(|post| PostLink {
                post,
                html: format!("<a>{}</a>", post.title),
            })
            .collect()
    }

    fn fixture() -> Vec<Post> {
        vec![
            post("2022_1_1", "Shaders", &["webgl", "graphics"]),
            post("2021_1_1", "Plants", &["simulation"]),
            post("2020_1_1", "Noise", &["graphics", "noise"]),
            post("2019_1_1", "Untagged", &[]),
        ]
    }

    #[test]
    fn test_tag_file_name() {
        assert_eq!(tag_file_name("webgl"), "tag_webgl.html");
        assert_eq!(tag_file_name("Procedural Art"), "tag_procedural_art.html");
    }

    #[test]
    fn test_pages_are_sorted() {
        let posts = fixture();
        let links = links(&posts);
        let index = TagIndex::build(&links);

        let files: Vec<_> = index.iter().map(|(file, _)| file).collect();
        assert_eq!(
            files,
            vec![
                "tag_graphics.html",
                "tag_noise.html",
                "tag_simulation.html",
                "tag_webgl.html"
            ]
        );
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_links_keep_post_order() {
        let posts = fixture();
        let links = links(&posts);
        let index = TagIndex::build(&links);

        assert_eq!(
            index.get("graphics").unwrap().links,
            vec!["<a>Shaders</a>", "<a>Noise</a>"]
        );
        assert_eq!(index.get("simulation").unwrap().links, vec!["<a>Plants</a>"]);
        assert!(index.get("rust").is_none());
    }

    #[test]
    fn test_membership_matches_tag_sets() {
        let posts = fixture();
        let links = links(&posts);
        let index = TagIndex::build(&links);

        for (_, page) in index.iter() {
            for link in &links {
                assert_eq!(
                    page.links.contains(&link.html.as_str()),
                    link.post.has_tag(page.label)
                );
            }
        }

        let listed: BTreeSet<_> = index
            .iter()
            .flat_map(|(_, page)| page.links.iter().copied())
            .collect();
        let tagged: BTreeSet<_> = links
            .iter()
            .filter(|link| !link.post.tags.is_empty())
            .map(|link| link.html.as_str())
            .collect();
        assert_eq!(listed, tagged);
    }

    #[test]
    fn test_spellings_of_one_tag_share_a_page() {
        let posts = vec![
            post("2021_1_1", "Upper", &["WebGL"]),
            post("2020_1_1", "Lower", &["webgl"]),
            post("2019_1_1", "Both", &["webgl", "WebGL"]),
        ];
        let links = links(&posts);
        let index = TagIndex::build(&links);

        assert_eq!(index.len(), 1);
        let page = index.get("webgl").unwrap();
        assert_eq!(page.label, "WebGL");
        assert_eq!(page.links, vec!["<a>Upper</a>", "<a>Lower</a>", "<a>Both</a>"]);
        assert_eq!(index.get("WebGL"), Some(page));
    }

    #[test]
    fn test_repeated_tag_lists_post_once() {
        let posts = vec![post("2020_1_1", "Twice", &["a", "a"])];
        let links = links(&posts);
        let index = TagIndex::build(&links);

        assert_eq!(index.get("a").unwrap().links.len(), 1);
    }

    #[test]
    fn test_empty_index() {
        let index = TagIndex::build(&[]);
        assert!(index.is_empty());
    }
}
