//! Index pagination and post neighbors.
//!
//! Both work on the same canonical post order (most recent first) but are
//! otherwise independent: pagination slices rendered post links into index
//! pages, neighbors link each post to the chronologically adjacent ones.

use quire_core::{Post, config::HOME_FILE};

/// Split `links` into pages of at most `capacity` entries, preserving order.
///
/// Produces `ceil(len / capacity)` pages, so no links means no pages. A zero
/// capacity is treated as one.
#[must_use]
pub fn paginate<T>(links: &[T], capacity: usize) -> Vec<&[T]> {
    links.chunks(capacity.max(1)).collect()
}

/// File name of index page `index`. The first page is the home page; later
/// pages are `index1.html`, `index2.html`, and so on.
#[must_use]
pub fn page_file_name(index: usize) -> String {
    match index {
        0 => HOME_FILE.to_string(),
        i => format!("index{i}.html"),
    }
}

/// The posts adjacent to one post in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Neighbors<'a> {
    /// The next older post.
    pub previous: Option<&'a Post>,

    /// The next newer post.
    pub next: Option<&'a Post>,
}

/// Neighbors of every post in `posts`, which must be ordered most recent first.
/// Entry `i` belongs to `posts[i]`.
#[must_use]
pub fn neighbors(posts: &[Post]) -> Vec<Neighbors<'_>> {
    (0..posts.len())
        .map(|i| Neighbors {
            previous: posts.get(i + 1),
            next: i.checked_sub(1).and_then(|j| posts.get(j)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use quire_core::PostProperties;

    use super::*;

    fn post(directory: &str, title: &str) -> Post {
        Post::new(
            directory,
            PostProperties {
                title: title.to_string(),
                summary: String::new(),
                preview: String::new(),
                tags: vec![],
            },
            String::new(),
        )
        .unwrap()
    }

    fn fragments(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("<div>{i}</div>")).collect()
    }

    #[test]
    fn test_paginate() {
        let items = fragments(10);

        let pages = paginate(&items, 3);
        assert_eq!(pages.len(), 4);
        assert_eq!(pages[0], &items[0..3]);
        assert_eq!(pages[1], &items[3..6]);
        assert_eq!(pages[3], &items[9..10]);
    }

    #[test]
    fn test_paginate_exact_fit() {
        let items = fragments(4);
        let pages = paginate(&items, 2);
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|page| page.len() == 2));
    }

    #[test]
    fn test_paginate_empty() {
        assert!(paginate::<String>(&[], 5).is_empty());
    }

    #[test]
    fn test_paginate_zero_capacity() {
        let items = fragments(2);
        assert_eq!(paginate(&items, 0).len(), 2);
    }

    #[test]
    fn test_page_file_names() {
        assert_eq!(page_file_name(0), "index.html");
        assert_eq!(page_file_name(1), "index1.html");
        assert_eq!(page_file_name(12), "index12.html");
    }

    #[test]
    fn test_neighbors() {
        let posts = vec![
            post("2022_1_1", "Newest"),
            post("2021_1_1", "Middle"),
            post("2020_1_1", "Oldest"),
        ];
        let links = neighbors(&posts);

        assert_eq!(links.len(), 3);
        assert_eq!(links[0].next, None);
        assert_eq!(links[0].previous, Some(&posts[1]));
        assert_eq!(links[1].next, Some(&posts[0]));
        assert_eq!(links[1].previous, Some(&posts[2]));
        assert_eq!(links[2].next, Some(&posts[1]));
        assert_eq!(links[2].previous, None);
    }

    #[test]
    fn test_neighbors_single_and_empty() {
        assert!(neighbors(&[]).is_empty());

        let posts = vec![post("2020_1_1", "Only")];
        assert_eq!(neighbors(&posts), vec![Neighbors::default()]);
    }

    #[test]
    fn test_two_post_scenario() {
        let mut posts = vec![post("2020_01_01", "A"), post("2020_02_01", "B")];
        posts.sort_by(Post::chronological_desc);
        let links = neighbors(&posts);

        assert_eq!(posts[0].title, "B");
        assert_eq!(links[0].previous.map(|p| p.title.as_str()), Some("A"));
        assert_eq!(links[1].next.map(|p| p.title.as_str()), Some("B"));
    }

    proptest! {
        #[test]
        fn prop_pages_reassemble_fragments(count in 0usize..200, capacity in 1usize..20) {
            let items = fragments(count);
            let pages = paginate(&items, capacity);

            prop_assert_eq!(pages.len(), count.div_ceil(capacity));
            prop_assert!(pages.iter().all(|page| !page.is_empty() && page.len() <= capacity));

            let joined: Vec<String> = pages.concat();
            prop_assert_eq!(joined, items);
        }
    }
}
