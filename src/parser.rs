//! Loads [`Post`]s from a Jekyll-style `_posts` directory. Post files are
//! named `YYYY-MM-DD-slug.ext` and begin with YAML front matter, for example:
//!
//! ```md
//! ---
//! title: Hello, world!
//! tags: [Rust, Web Development]
//! ---
//! # Hello
//! ```
//!
//! Posts come back sorted oldest first. That order matters: it decides which
//! casing of a tag is displayed on its tag page.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_yaml::Value;
use tracing::debug;
use url::Url;
use walkdir::WalkDir;

use crate::{frontmatter, post::Post, tag::capitalize};

const POST_EXTENSIONS: &[&str] = &["md", "markdown", "html"];

const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parses [`Post`] objects from source files.
pub struct Parser<'a> {
    /// The URL post permalinks are resolved against. It should end in a
    /// trailing slash.
    site_root: &'a Url,

    /// Whether posts dated after `now` are kept.
    future: bool,

    now: NaiveDateTime,
}

impl<'a> Parser<'a> {
    /// Constructs a new parser. Unless `future` is set, posts dated after the
    /// current local time are skipped.
    pub fn new(site_root: &'a Url, future: bool) -> Parser<'a> {
        Parser {
            site_root,
            future,
            now: Local::now().naive_local(),
        }
    }

    /// Walks `source_directory` and returns its posts ordered by date (oldest
    /// first), with ties broken by ID. A missing directory has no posts.
    /// Unpublished posts, future posts, and files that aren't dated post
    /// files are skipped.
    pub fn parse_posts(&self, source_directory: &Path) -> Result<Vec<Post>> {
        if !source_directory.is_dir() {
            debug!(dir = %source_directory.display(), "no posts directory");
            return Ok(Vec::new());
        }

        let mut posts = Vec::new();
        for result in WalkDir::new(source_directory) {
            let entry = result?;
            if !entry.file_type().is_file() || is_ignored(entry.file_name().to_str()) {
                continue;
            }
            let relative_path = entry
                .path()
                .strip_prefix(source_directory)
                .unwrap_or_else(|_| entry.path());
            if let Some(post) = self.parse_post(source_directory, relative_path)? {
                posts.push(post);
            }
        }

        posts.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(posts)
    }

    /// Parses a single post, annotating any error with the post's path.
    fn parse_post(
        &self,
        posts_source_directory: &Path,
        relative_path: &Path,
    ) -> Result<Option<Post>> {
        match self._parse_post(posts_source_directory, relative_path) {
            Ok(p) => Ok(p),
            Err(e) => Err(Error::Annotated(
                format!("parsing post `{}`", relative_path.display()),
                Box::new(e),
            )),
        }
    }

    fn _parse_post(
        &self,
        posts_source_directory: &Path,
        relative_path: &Path,
    ) -> Result<Option<Post>> {
        let file_name = relative_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::InvalidFileName(relative_path.to_owned()))?;

        let (stem, extension) = match file_name.rsplit_once('.') {
            Some(parts) => parts,
            None => return Ok(None),
        };
        if !POST_EXTENSIONS.contains(&extension) {
            debug!(path = %relative_path.display(), "not a post file");
            return Ok(None);
        }
        let (file_date, slug) = match split_file_name(stem) {
            Some(parts) => parts,
            None => {
                debug!(path = %relative_path.display(), "post file name has no date");
                return Ok(None);
            }
        };

        let contents = std::fs::read_to_string(posts_source_directory.join(relative_path))?;
        let (data, _body) = frontmatter::parse(&contents)?;
        let frontmatter: Frontmatter = serde_yaml::from_value(Value::Mapping(data.clone()))?;

        if !frontmatter.published {
            debug!(path = %relative_path.display(), "skipping unpublished post");
            return Ok(None);
        }

        let date = match &frontmatter.date {
            Some(date) => parse_date(date).ok_or_else(|| Error::InvalidDate(date.clone()))?,
            None => file_date,
        };
        if !self.future && date > self.now {
            debug!(path = %relative_path.display(), %date, "skipping future post");
            return Ok(None);
        }

        let url_path = match frontmatter.permalink.and_then(scalar) {
            Some(permalink) => permalink.trim_start_matches('/').to_owned(),
            None => format!("{}/{}.html", date.format("%Y/%m/%d"), slug),
        };

        let mut tags = frontmatter.tags.map(tag_list).unwrap_or_default();
        if let Some(tag) = frontmatter.tag.and_then(scalar) {
            tags.push(tag);
        }

        Ok(Some(Post {
            id: relative_path.with_extension("").to_string_lossy().into_owned(),
            title: frontmatter
                .title
                .and_then(scalar)
                .unwrap_or_else(|| titleize(slug)),
            date,
            url: self.site_root.join(&url_path)?,
            url_path,
            tags,
            data,
        }))
    }
}

/// Editor backups, hidden files and the like.
fn is_ignored(file_name: Option<&str>) -> bool {
    match file_name {
        Some(name) => name.starts_with(|c: char| matches!(c, '.' | '_' | '#' | '~')),
        None => false,
    }
}

/// Splits `YYYY-MM-DD-slug` into its date and slug.
fn split_file_name(stem: &str) -> Option<(NaiveDateTime, &str)> {
    let date = NaiveDate::parse_from_str(stem.get(..10)?, "%Y-%m-%d").ok()?;
    let slug = stem.get(10..)?.strip_prefix('-')?;
    if slug.is_empty() {
        return None;
    }
    Some((date.and_hms_opt(0, 0, 0)?, slug))
}

/// Parses a front matter date. Offsets are dropped in favor of the wall-clock
/// time they were written in.
fn parse_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(date) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S %z") {
        return Some(date.naive_local());
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(date) = NaiveDateTime::parse_from_str(s, format) {
            return Some(date);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// `hello-big-world` -> `Hello Big World`
fn titleize(slug: &str) -> String {
    slug.split('-')
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Front matter values are loosely typed: `title: 2021` is as good a title as
/// `title: "2021"`, so scalars are read as [`Value`]s and converted with
/// [`scalar`].
#[derive(Deserialize)]
struct Frontmatter {
    #[serde(default)]
    title: Option<Value>,

    /// Overrides the date in the file name.
    #[serde(default)]
    date: Option<String>,

    /// Either a list of tags or a single whitespace-separated string.
    #[serde(default)]
    tags: Option<Value>,

    /// A single extra tag.
    #[serde(default)]
    tag: Option<Value>,

    #[serde(default = "default_published")]
    published: bool,

    #[serde(default)]
    permalink: Option<Value>,
}

fn default_published() -> bool {
    true
}

/// The text of a string, number or boolean. Anything else has none.
fn scalar(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn tag_list(value: Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.into_iter().filter_map(scalar).collect(),
        Value::String(text) => text.split_whitespace().map(str::to_owned).collect(),
        other => scalar(other).into_iter().collect(),
    }
}

/// Represents the result of a [`Post`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Post`] object.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post's front matter is missing or malformed.
    Frontmatter(frontmatter::Error),

    /// Returned when the front matter doesn't match the expected fields.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when a front matter `date` isn't in a recognized format.
    InvalidDate(String),

    /// Returned when a post file name isn't valid UTF-8.
    InvalidFileName(PathBuf),

    /// Returned when a permalink can't be joined onto the site root.
    UrlParse(url::ParseError),

    /// Returned for other I/O errors.
    Io(std::io::Error),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Frontmatter(err) => err.fmt(f),
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::InvalidDate(date) => write!(f, "invalid date: `{}`", date),
            Error::InvalidFileName(path) => write!(f, "invalid file name: {:?}", path),
            Error::UrlParse(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
            Error::Annotated(annotation, err) => write!(f, "{}: {}", annotation, err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Frontmatter(err) => Some(err),
            Error::DeserializeYaml(err) => Some(err),
            Error::InvalidDate(_) => None,
            Error::InvalidFileName(_) => None,
            Error::UrlParse(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<frontmatter::Error> for Error {
    fn from(err: frontmatter::Error) -> Error {
        Error::Frontmatter(err)
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL joining.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
