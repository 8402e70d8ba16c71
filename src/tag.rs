//! Defines the tag index builder. Given a sequence of posts, it derives one
//! [`TagPage`] for each distinct tag, where tags that differ only by case are
//! the same tag. The first casing encountered (in post order) is the one that
//! gets displayed.
//!
//! Everything here is pure: posts come in as a parameter and pages go out as
//! a return value. Registering the pages for rendering is up to the caller
//! (see [`crate::build`]).

use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// The name of the layout that tag pages are rendered with. When a site has
/// no layout by this name, no tag pages are generated.
pub const TAG_LAYOUT: &str = "tag_page";

/// Anything that carries an ordered list of free-text tags. Implemented for
/// [`crate::post::Post`], and for plain tag lists so the builder can be driven
/// without touching the file system.
pub trait Tagged {
    fn tags(&self) -> &[String];
}

impl Tagged for Vec<String> {
    fn tags(&self) -> &[String] {
        self
    }
}

impl Tagged for Option<Vec<String>> {
    /// An absent tag list is an empty one.
    fn tags(&self) -> &[String] {
        self.as_deref().unwrap_or(&[])
    }
}

/// How a tag key is turned into a path segment.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SlugMode {
    /// Replace spaces with hyphens and leave everything else alone, so
    /// `web development` becomes `web-development` and `ci/cd` stays `ci/cd`.
    Spaces,

    /// Run the key through [`slug::slugify`], so `ci/cd` becomes `ci-cd`.
    Full,
}

impl Default for SlugMode {
    fn default() -> Self {
        SlugMode::Spaces
    }
}

impl SlugMode {
    /// Converts an already-lowercased tag key into a path segment.
    pub fn slugify(&self, key: &str) -> String {
        match self {
            SlugMode::Spaces => key.replace(' ', "-"),
            SlugMode::Full => slug::slugify(key),
        }
    }
}

/// One distinct tag and the posts that carry it.
#[derive(Debug)]
pub struct TagEntry<'a, P> {
    /// The lowercase form of the tag. Unique within a [`TagIndex`].
    pub key: String,

    /// The tag exactly as it was first encountered.
    pub display: String,

    /// Every post carrying the tag (in any casing), in post order. A post
    /// appears at most once even if it lists the tag more than once.
    pub posts: Vec<&'a P>,
}

/// An insertion-ordered, case-insensitive index of tags.
#[derive(Debug)]
pub struct TagIndex<'a, P> {
    entries: Vec<TagEntry<'a, P>>,
    positions: HashMap<String, usize>,
}

impl<'a, P: Tagged> TagIndex<'a, P> {
    /// Indexes every tag of every post, keeping blank tags as they are.
    pub fn from_posts<I>(posts: I) -> Self
    where
        I: IntoIterator<Item = &'a P>,
    {
        Self::collect(posts, false)
    }

    fn collect<I>(posts: I, skip_blank: bool) -> Self
    where
        I: IntoIterator<Item = &'a P>,
    {
        let mut index = TagIndex {
            entries: Vec::new(),
            positions: HashMap::new(),
        };

        for post in posts {
            for tag in post.tags() {
                if skip_blank && tag.trim().is_empty() {
                    warn!(tag = %tag, "skipping blank tag");
                    continue;
                }
                index.insert(tag, post);
            }
        }
        index
    }

    fn insert(&mut self, tag: &str, post: &'a P) {
        let key = tag.to_lowercase();
        match self.positions.get(&key) {
            Some(&i) => {
                let entry = &mut self.entries[i];
                // Posts are visited in order, so a repeat can only be the
                // most recently pushed post.
                if !entry.posts.last().map_or(false, |p| std::ptr::eq(*p, post)) {
                    entry.posts.push(post);
                }
            }
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push(TagEntry {
                    key,
                    display: tag.to_owned(),
                    posts: vec![post],
                });
            }
        }
    }
}

impl<'a, P> TagIndex<'a, P> {
    /// Looks up an entry by any casing of its tag.
    pub fn get(&self, tag: &str) -> Option<&TagEntry<'a, P>> {
        self.positions
            .get(&tag.to_lowercase())
            .map(|&i| &self.entries[i])
    }

    /// The entries in first-seen order.
    pub fn entries(&self) -> &[TagEntry<'a, P>] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TagEntry<'a, P>> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A generated tag page, ready to be handed to the renderer.
#[derive(Debug)]
pub struct TagPage<'a, P> {
    /// The page's path relative to the site root, e.g. `tag/web-development/`.
    pub url_path: String,

    /// The page title, e.g. `Web Development Articles`.
    pub title: String,

    /// The tag as first encountered. Templates see this as `tag`.
    pub tag: String,

    /// The posts carrying the tag, in post order.
    pub posts: Vec<&'a P>,
}

impl<P> TagPage<'_, P> {
    /// The output file for the page relative to the output directory.
    pub fn output_path(&self) -> String {
        format!("{}index.html", self.url_path)
    }
}

/// Turns posts into [`TagPage`]s. The [`Default`] generator puts pages under
/// `tag/`, only replaces spaces when slugifying, and skips blank tags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Generator {
    /// The directory (and URL path prefix) tag pages are placed under.
    pub dir: String,

    /// How tag keys become path segments.
    pub slug: SlugMode,

    /// Whether empty and whitespace-only tags are dropped. When `false` they
    /// are kept and produce a degenerate `tag//` path.
    pub skip_blank: bool,
}

impl Default for Generator {
    fn default() -> Self {
        Generator {
            dir: String::from("tag"),
            slug: SlugMode::default(),
            skip_blank: true,
        }
    }
}

impl Generator {
    /// Builds one page per distinct tag across `posts`. Returns nothing when
    /// `layout_exists` is false, since there would be nothing to render the
    /// pages with.
    pub fn generate<'a, P, I>(&self, posts: I, layout_exists: bool) -> Vec<TagPage<'a, P>>
    where
        P: Tagged + 'a,
        I: IntoIterator<Item = &'a P>,
    {
        if !layout_exists {
            debug!("no tag page layout; generating nothing");
            return Vec::new();
        }

        TagIndex::collect(posts, self.skip_blank)
            .into_entries()
            .into_iter()
            .map(|entry| self.page(entry))
            .collect()
    }

    fn page<'a, P>(&self, entry: TagEntry<'a, P>) -> TagPage<'a, P> {
        TagPage {
            url_path: format!("{}/{}/", self.dir, self.slug.slugify(&entry.key)),
            title: format!("{} Articles", capitalize(&entry.display)),
            tag: entry.display,
            posts: entry.posts,
        }
    }
}

/// Builds tag pages with the [`Default`] [`Generator`].
pub fn build_tag_pages<'a, P, I>(posts: I, layout_exists: bool) -> Vec<TagPage<'a, P>>
where
    P: Tagged + 'a,
    I: IntoIterator<Item = &'a P>,
{
    Generator::default().generate(posts, layout_exists)
}

/// Uppercases the first character and leaves the rest as is, so `go` becomes
/// `Go` but `CI/CD` stays `CI/CD`.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tags(ts: &[&str]) -> Vec<String> {
        ts.iter().map(|t| t.to_string()).collect()
    }

    fn triples<P>(pages: &[TagPage<P>]) -> Vec<(String, String, String)> {
        pages
            .iter()
            .map(|p| (p.url_path.clone(), p.title.clone(), p.tag.clone()))
            .collect()
    }

    #[test]
    fn test_case_insensitive_dedup() {
        let posts = vec![tags(&["Rust"]), tags(&["rust", "RUST"]), tags(&["rUsT"])];
        let pages = build_tag_pages(&posts, true);
        assert_eq!(1, pages.len());
        assert_eq!("Rust", pages[0].tag);
        assert_eq!("tag/rust/", pages[0].url_path);
        assert_eq!(3, pages[0].posts.len());
    }

    #[test]
    fn test_first_seen_casing_wins() {
        let posts = vec![tags(&["go"]), tags(&["Go"])];
        let pages = build_tag_pages(&posts, true);
        assert_eq!(1, pages.len());
        assert_eq!("go", pages[0].tag);
        assert_eq!("Go Articles", pages[0].title);
    }

    #[test]
    fn test_slug_replaces_spaces() {
        let posts = vec![tags(&["Web Development"])];
        let pages = build_tag_pages(&posts, true);
        assert_eq!("tag/web-development/", pages[0].url_path);
        assert_eq!("tag/web-development/index.html", pages[0].output_path());
        assert_eq!("Web Development Articles", pages[0].title);
    }

    #[test]
    fn test_title_only_touches_first_character() {
        let posts = vec![tags(&["go", "CI/CD", "macOS"])];
        let pages = build_tag_pages(&posts, true);
        assert_eq!(
            vec![
                (
                    "tag/go/".to_owned(),
                    "Go Articles".to_owned(),
                    "go".to_owned()
                ),
                (
                    "tag/ci/cd/".to_owned(),
                    "CI/CD Articles".to_owned(),
                    "CI/CD".to_owned()
                ),
                (
                    "tag/macos/".to_owned(),
                    "MacOS Articles".to_owned(),
                    "macOS".to_owned()
                ),
            ],
            triples(&pages)
        );
    }

    #[test]
    fn test_no_posts() {
        let posts: Vec<Vec<String>> = Vec::new();
        assert!(build_tag_pages(&posts, true).is_empty());
    }

    #[test]
    fn test_missing_layout_generates_nothing() {
        let posts = vec![tags(&["rust", "go"]), tags(&["python"])];
        assert!(build_tag_pages(&posts, false).is_empty());
    }

    #[test]
    fn test_untagged_posts_contribute_nothing() {
        let posts: Vec<Option<Vec<String>>> =
            vec![None, Some(tags(&["zig"])), Some(Vec::new()), None];
        let pages = build_tag_pages(&posts, true);
        assert_eq!(1, pages.len());
        assert_eq!("zig", pages[0].tag);
        assert_eq!(1, pages[0].posts.len());
    }

    #[test]
    fn test_idempotent() {
        let posts = vec![tags(&["a", "B"]), tags(&["b", "C d"])];
        let first = build_tag_pages(&posts, true);
        let second = build_tag_pages(&posts, true);
        assert_eq!(triples(&first), triples(&second));
        assert_eq!(3, first.len());
    }

    #[test]
    fn test_pages_follow_first_seen_order() {
        let posts = vec![tags(&["zeta", "alpha"]), tags(&["Mid", "ALPHA"])];
        let pages = build_tag_pages(&posts, true);
        let order: Vec<&str> = pages.iter().map(|p| p.tag.as_str()).collect();
        assert_eq!(vec!["zeta", "alpha", "Mid"], order);
    }

    #[test]
    fn test_repeated_tag_lists_post_once() {
        let posts = vec![tags(&["Go", "go", "GO"]), tags(&["go"])];
        let index = TagIndex::from_posts(&posts);
        let entry = index.get("gO").unwrap();
        assert_eq!("Go", entry.display);
        assert_eq!(2, entry.posts.len());
        assert!(std::ptr::eq(entry.posts[0], &posts[0]));
        assert!(std::ptr::eq(entry.posts[1], &posts[1]));
    }

    #[test]
    fn test_blank_tags_skipped_by_default() {
        let posts = vec![tags(&["", "  ", "real"])];
        let pages = build_tag_pages(&posts, true);
        assert_eq!(1, pages.len());
        assert_eq!("tag/real/", pages[0].url_path);
    }

    #[test]
    fn test_blank_tags_kept_when_asked() {
        let generator = Generator {
            skip_blank: false,
            ..Generator::default()
        };
        let posts = vec![tags(&[""])];
        let pages = generator.generate(&posts, true);
        assert_eq!(1, pages.len());
        assert_eq!("tag//", pages[0].url_path);
        assert_eq!(" Articles", pages[0].title);

        // `TagIndex::from_posts` never skips.
        assert_eq!(1, TagIndex::from_posts(&posts).len());
    }

    #[test]
    fn test_full_slug_mode_and_custom_dir() {
        let generator = Generator {
            dir: String::from("topics"),
            slug: SlugMode::Full,
            skip_blank: true,
        };
        let posts = vec![tags(&["CI/CD", "Web  Development"])];
        let pages = generator.generate(&posts, true);
        assert_eq!("topics/ci-cd/", pages[0].url_path);
        assert_eq!("topics/web-development/", pages[1].url_path);
        assert_eq!("CI/CD", pages[0].tag);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!("", capitalize(""));
        assert_eq!("Go", capitalize("go"));
        assert_eq!("CI/CD", capitalize("CI/CD"));
        assert_eq!("Élan", capitalize("élan"));
        assert_eq!("1password", capitalize("1password"));
    }

    #[test]
    fn test_slug_mode_deserializes_lowercase() {
        let mode: SlugMode = serde_yaml::from_str("full").unwrap();
        assert_eq!(SlugMode::Full, mode);
        let mode: SlugMode = serde_yaml::from_str("spaces").unwrap();
        assert_eq!(SlugMode::Spaces, mode);
    }
}
