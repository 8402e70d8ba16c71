use crate::layout::{Layout, Layouts};
use crate::post::Post;
use crate::tag::TagPage;
use crate::value;
use gtmpl::{Context, Template, Value};
use std::collections::{hash_map::Entry, HashMap, HashSet};
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

/// Responsible for templating tag pages and writing them to disk.
pub struct Writer<'a> {
    /// The layout tag pages are rendered with, followed by each layout it is
    /// wrapped in (outermost last).
    chain: Vec<(&'a Layout, Template)>,

    /// The site's root URL. Page URLs are resolved against it, and it is made
    /// available to templates as `site_root`.
    site_root: &'a Url,

    /// The directory tag pages are written under. A page whose `url_path` is
    /// `tag/rust/` is written to `{output_directory}/tag/rust/index.html`.
    output_directory: &'a Path,
}

impl<'a> Writer<'a> {
    /// Prepares the templates for `layout` and every layout it is wrapped in.
    /// Fails if any of them is missing, doesn't parse, or if the chain of
    /// layouts loops back on itself.
    pub fn new(
        layouts: &'a Layouts,
        layout: &str,
        site_root: &'a Url,
        output_directory: &'a Path,
    ) -> Result<Writer<'a>> {
        let mut chain = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut next = Some(layout);
        while let Some(name) = next {
            if !seen.insert(name) {
                return Err(Error::LayoutCycle(name.to_owned()));
            }
            let layout = layouts
                .get(name)
                .ok_or_else(|| Error::MissingLayout(name.to_owned()))?;
            chain.push((layout, parse_template(layout)?));
            next = layout.parent();
        }

        Ok(Writer {
            chain,
            site_root,
            output_directory,
        })
    }

    /// Renders each page and writes it to `{output_directory}/{url_path}/index.html`.
    /// Returns the number of files written. A page whose path would leave
    /// the output directory is skipped, as is a page whose `url_path` was
    /// already claimed by an earlier page.
    pub fn write_pages(&self, pages: &[TagPage<Post>]) -> Result<usize> {
        let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
        let mut claimed: HashMap<&str, &str> = HashMap::new();
        let mut written = 0;
        for page in pages {
            let output_path = page.output_path();
            if !is_contained(Path::new(&output_path)) {
                warn!(
                    tag = %page.tag,
                    path = %output_path,
                    "tag page path leaves the output directory; skipping"
                );
                continue;
            }
            match claimed.entry(page.url_path.as_str()) {
                Entry::Occupied(first) => {
                    warn!(
                        tag = %page.tag,
                        kept = %first.get(),
                        path = %page.url_path,
                        "conflict: tag page path already written; skipping"
                    );
                    continue;
                }
                Entry::Vacant(slot) => {
                    slot.insert(page.tag.as_str());
                }
            }

            let file_path = self.output_directory.join(&output_path);
            if let Some(dir) = file_path.parent() {
                if seen_dirs.insert(dir.to_owned()) {
                    std::fs::create_dir_all(dir)?;
                }
            }
            debug!(path = %file_path.display(), tag = %page.tag, "writing tag page");
            std::fs::write(&file_path, self.render(page)?)?;
            written += 1;
        }
        Ok(written)
    }

    /// Renders a single page through the layout chain. Each outer layout sees
    /// the previous output as `content` and its own front matter as `layout`.
    pub fn render(&self, page: &TagPage<Post>) -> Result<String> {
        let mut context = self.page_context(page)?;
        let mut content = String::new();
        for (i, (layout, template)) in self.chain.iter().enumerate() {
            if i > 0 {
                context.insert("content".to_owned(), Value::String(content));
                context.insert("layout".to_owned(), Value::Object(value::object(&layout.data)));
            }
            content = execute(template, &context)?;
        }
        Ok(content)
    }

    /// Builds the template data for a page: the tag page layout's front
    /// matter, overlaid with `tag`, `title`, `url`, `url_path`, `site_root`,
    /// and `posts` (newest first).
    fn page_context(&self, page: &TagPage<Post>) -> Result<HashMap<String, Value>> {
        let mut m = match self.chain.first() {
            Some((layout, _)) => value::object(&layout.data),
            None => HashMap::new(),
        };
        m.insert("tag".to_owned(), Value::String(page.tag.clone()));
        m.insert("title".to_owned(), Value::String(page.title.clone()));
        m.insert(
            "url".to_owned(),
            Value::String(self.site_root.join(&page.url_path)?.to_string()),
        );
        m.insert("url_path".to_owned(), Value::String(page.url_path.clone()));
        m.insert("site_root".to_owned(), Value::String(self.site_root.to_string()));
        m.insert(
            "posts".to_owned(),
            Value::Array(page.posts.iter().rev().map(|post| Value::from(*post)).collect()),
        );
        Ok(m)
    }
}

/// Whether `path` is a plain relative path that can't climb out of the
/// directory it is joined onto. Empty paths are not.
pub fn is_contained(path: &Path) -> bool {
    let mut components = path.components().peekable();
    components.peek().is_some() && components.all(|c| matches!(c, Component::Normal(_)))
}

fn parse_template(layout: &Layout) -> Result<Template> {
    let mut template = Template::default();
    template
        .parse(&layout.body)
        .map_err(|err| Error::ParseTemplate {
            layout: layout.name.clone(),
            err,
        })?;
    Ok(template)
}

fn execute(template: &Template, context: &HashMap<String, Value>) -> Result<String> {
    let mut out: Vec<u8> = Vec::new();
    template.execute(&mut out, &Context::from(Value::Object(context.clone()))?)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// Returned when the layout (or one it is wrapped in) doesn't exist.
    MissingLayout(String),

    /// Returned when a layout is, directly or indirectly, wrapped in itself.
    LayoutCycle(String),

    /// Returned when a layout isn't a valid template.
    ParseTemplate { layout: String, err: String },

    /// An error during templating.
    Template(String),

    /// Returned when a page URL can't be joined onto the site root.
    UrlParse(url::ParseError),

    /// An error writing the output files.
    Io(io::Error),
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use the
    /// `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`]. This
    /// allows us to use the `?` operator for fallible template operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingLayout(name) => write!(f, "layout `{}` not found", name),
            Error::LayoutCycle(name) => {
                write!(f, "layout `{}` is wrapped in itself", name)
            }
            Error::ParseTemplate { layout, err } => {
                write!(f, "parsing layout `{}`: {}", layout, err)
            }
            Error::Template(err) => err.fmt(f),
            Error::UrlParse(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MissingLayout(_) => None,
            Error::LayoutCycle(_) => None,
            Error::ParseTemplate { .. } => None,
            Error::Template(_) => None,
            Error::UrlParse(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}
