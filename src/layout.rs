//! The layout registry. A site's `_layouts` directory holds one template per
//! file; the layout's name is the file name less its extension, so
//! `_layouts/tag_page.html` is the `tag_page` layout. Layouts may begin with
//! front matter, which becomes page data for anything rendered with them.

use crate::frontmatter;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::fmt;
use std::iter::FromIterator;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A single template from the layout registry.
#[derive(Clone, Debug)]
pub struct Layout {
    /// The layout's name (its file stem).
    pub name: String,

    /// The layout's front matter, or an empty mapping.
    pub data: Mapping,

    /// The template text following the front matter.
    pub body: String,
}

impl Layout {
    /// The layout this one is wrapped in, if its front matter names one.
    pub fn parent(&self) -> Option<&str> {
        self.data
            .get(&Value::from("layout"))
            .and_then(Value::as_str)
    }
}

/// Every layout of a site, by name.
#[derive(Debug, Default)]
pub struct Layouts {
    layouts: HashMap<String, Layout>,
}

impl Layouts {
    /// Loads each file directly inside `dir` as a layout. A missing directory
    /// means an empty registry. Hidden files are ignored, and if two files
    /// share a stem the first one by file name wins.
    pub fn load(dir: &Path) -> Result<Layouts> {
        let mut layouts = Layouts::default();
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "no layouts directory");
            return Ok(layouts);
        }

        let mut paths = Vec::new();
        for result in std::fs::read_dir(dir)? {
            let entry = result?;
            if entry.file_type()?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();

        for path in paths {
            let name = match path.file_stem().and_then(|stem| stem.to_str()) {
                Some(name) if !name.starts_with('.') && !name.is_empty() => name.to_owned(),
                _ => continue,
            };
            if layouts.contains(&name) {
                warn!(layout = %name, path = %path.display(), "duplicate layout ignored");
                continue;
            }
            let layout = load_layout(name, &path)?;
            layouts.insert(layout);
        }
        Ok(layouts)
    }

    fn insert(&mut self, layout: Layout) {
        self.layouts.insert(layout.name.clone(), layout);
    }

    /// Reports whether a layout named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.layouts.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Layout> {
        self.layouts.get(name)
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// The layout names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.layouts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl FromIterator<Layout> for Layouts {
    fn from_iter<I: IntoIterator<Item = Layout>>(iter: I) -> Self {
        let mut layouts = Layouts::default();
        for layout in iter {
            layouts.insert(layout);
        }
        layouts
    }
}

fn load_layout(name: String, path: &Path) -> Result<Layout> {
    let contents = std::fs::read_to_string(path).map_err(|err| Error::Read {
        path: path.to_owned(),
        err,
    })?;
    let (data, body) = frontmatter::parse_optional(&contents).map_err(|err| Error::Frontmatter {
        path: path.to_owned(),
        err,
    })?;
    Ok(Layout {
        name,
        data,
        body: body.to_owned(),
    })
}

/// Represents the result of loading layouts.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading layouts.
#[derive(Debug)]
pub enum Error {
    /// Returned when a layout file can't be read.
    Read { path: PathBuf, err: std::io::Error },

    /// Returned when a layout's front matter is malformed.
    Frontmatter {
        path: PathBuf,
        err: frontmatter::Error,
    },

    /// Returned for I/O errors listing the layouts directory.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Read { path, err } => {
                write!(f, "Reading layout '{}': {}", path.display(), err)
            }
            Error::Frontmatter { path, err } => {
                write!(f, "Loading layout '{}': {}", path.display(), err)
            }
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Read { path: _, err } => Some(err),
            Error::Frontmatter { path: _, err } => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn test_load() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join("tag_page.html"),
            "---\nlayout: default\nsidebar: false\n---\n<h1>{{ .title }}</h1>\n",
        )?;
        fs::write(dir.path().join("default.html"), "<main>{{ .content }}</main>")?;
        fs::write(dir.path().join(".default.html.swp"), "junk")?;
        fs::create_dir(dir.path().join("partials"))?;

        let layouts = Layouts::load(dir.path())?;
        assert_eq!(vec!["default", "tag_page"], layouts.names());
        assert!(layouts.contains("tag_page"));
        assert!(!layouts.contains("post"));

        let tag_page = layouts.get("tag_page").unwrap();
        assert_eq!("<h1>{{ .title }}</h1>\n", tag_page.body);
        assert_eq!(Some("default"), tag_page.parent());
        assert_eq!(
            Some(&Value::Bool(false)),
            tag_page.data.get(&Value::from("sidebar"))
        );

        let default = layouts.get("default").unwrap();
        assert!(default.data.is_empty());
        assert_eq!(None, default.parent());
        Ok(())
    }

    #[test]
    fn test_missing_directory_is_empty() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let layouts = Layouts::load(&dir.path().join("_layouts"))?;
        assert!(layouts.is_empty());
        assert!(!layouts.contains("tag_page"));
        Ok(())
    }

    #[test]
    fn test_duplicate_stems_keep_first() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("page.html"), "html")?;
        fs::write(dir.path().join("page.md"), "markdown")?;
        let layouts = Layouts::load(dir.path())?;
        assert_eq!(1, layouts.len());
        assert_eq!("html", layouts.get("page").unwrap().body);
        Ok(())
    }

    #[test]
    fn test_bad_front_matter() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tag_page.html"), "---\ntitle: x\n").unwrap();
        let err = Layouts::load(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            Error::Frontmatter {
                err: frontmatter::Error::MissingEndFence,
                ..
            }
        ));
    }
}
