//! Defines the [`Post`] type. See [`crate::parser`] for how posts are loaded
//! from a `_posts` directory.

use crate::tag::Tagged;
use chrono::NaiveDateTime;
use serde_yaml::Mapping;
use url::Url;

/// A post as seen by the tag index builder and by tag page templates.
#[derive(Clone, Debug)]
pub struct Post {
    /// The source path relative to the posts directory, less the extension
    /// (e.g., `2021-04-16-hello` or `travel/2021-04-16-hello`).
    pub id: String,

    /// The title from the front matter, or one derived from the file name.
    pub title: String,

    /// The date from the front matter if present, otherwise from the file
    /// name.
    pub date: NaiveDateTime,

    /// The permalink relative to the site root (no leading slash).
    pub url_path: String,

    /// The absolute URL for the post.
    pub url: Url,

    /// The post's tags in the order they were listed.
    pub tags: Vec<String>,

    /// The complete front matter.
    pub data: Mapping,
}

impl Tagged for Post {
    fn tags(&self) -> &[String] {
        &self.tags
    }
}
