//! Exports the [`build_site`] function which stitches together one generation
//! pass: parsing the posts ([`crate::parser`]), loading the layout registry
//! ([`crate::layout`]), deriving the tag pages ([`crate::tag`]), and rendering
//! them to disk ([`crate::write`]).

use crate::config::Config;
use crate::layout::{Error as LayoutError, Layouts};
use crate::parser::{Error as ParseError, Parser as PostParser};
use crate::post::Post;
use crate::write::{is_contained, Error as WriteError, Writer};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// What a generation pass produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// The number of posts that were parsed.
    pub posts: usize,

    /// The number of tag page files written. Zero when the site has no tag
    /// page layout. Pages skipped for sharing a path with an earlier page
    /// aren't counted.
    pub pages: usize,
}

/// Builds the tag pages for the site described by a [`Config`]. If the site
/// has no layout named [`Config::tag_layout`], nothing is written and the
/// summary reports zero pages.
pub fn build_site(config: &Config) -> Result<Summary> {
    let (posts, layouts) = load(config)?;
    let layout_exists = layouts.contains(&config.tag_layout);
    if !layout_exists {
        info!(layout = %config.tag_layout, "layout not found; skipping tag pages");
    }

    // Registering the pages means handing them to the writer.
    let pages = config.generator.generate(&posts, layout_exists);
    if pages.is_empty() {
        return Ok(Summary {
            posts: posts.len(),
            pages: 0,
        });
    }

    // Blow away the old tag directory so tags that no longer exist don't
    // linger. Only the tag directory, never the whole output directory.
    if is_contained(Path::new(&config.generator.dir)) {
        rmdir(&config.output_directory.join(&config.generator.dir))?;
    }

    let writer = Writer::new(
        &layouts,
        &config.tag_layout,
        &config.site_root,
        &config.output_directory,
    )?;
    let written = writer.write_pages(&pages)?;
    info!(
        pages = written,
        dir = %config.output_directory.display(),
        "wrote tag pages"
    );

    Ok(Summary {
        posts: posts.len(),
        pages: written,
    })
}

/// Lists `(url_path, title)` for every tag page the site would get, without
/// writing anything.
pub fn list_tag_pages(config: &Config) -> Result<Vec<(String, String)>> {
    let (posts, layouts) = load(config)?;
    let layout_exists = layouts.contains(&config.tag_layout);
    Ok(config
        .generator
        .generate(&posts, layout_exists)
        .into_iter()
        .map(|page| (page.url_path, page.title))
        .collect())
}

fn load(config: &Config) -> Result<(Vec<Post>, Layouts)> {
    let posts = PostParser::new(&config.site_root, config.future)
        .parse_posts(&config.posts_source_directory)?;
    info!(
        posts = posts.len(),
        dir = %config.posts_source_directory.display(),
        "parsed posts"
    );

    let layouts = Layouts::load(&config.layouts_directory)?;
    info!(layouts = layouts.len(), "loaded layouts");
    Ok((posts, layouts))
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for a generation pass. Errors can come from parsing posts,
/// loading layouts, writing pages, or cleaning the tag output directory.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors during parsing.
    Parse(ParseError),

    /// Returned for errors loading the layout registry.
    Layout(LayoutError),

    /// Returned for errors rendering or writing tag pages.
    Write(WriteError),

    /// Returned for I/O problems while cleaning the tag output directory.
    Clean { path: PathBuf, err: std::io::Error },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => err.fmt(f),
            Error::Layout(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Layout(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
        }
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<LayoutError> for Error {
    /// Converts [`LayoutError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: LayoutError) -> Error {
        Error::Layout(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, relative_path: &str, contents: &str) {
        let path = dir.path().join(relative_path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn site() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "_config.yml", "url: https://example.com\n");
        write(
            &dir,
            "_posts/2021-01-01-first.md",
            "---\ntitle: First\ntags: [go, Web Development]\n---\n",
        );
        write(
            &dir,
            "_posts/2021-02-01-second.md",
            "---\ntitle: Second\ntags: [Go, CI/CD]\n---\n",
        );
        write(&dir, "_posts/2021-03-01-untagged.md", "---\ntitle: Untagged\n---\n");
        dir
    }

    #[test]
    fn test_build_site() -> Result<()> {
        let dir = site();
        write(
            &dir,
            "_layouts/tag_page.html",
            "{{ .title }}:{{ range .posts }} {{ .title }}{{ end }}",
        );
        let config = Config::from_directory(dir.path(), None).unwrap();

        let summary = build_site(&config)?;
        assert_eq!(Summary { posts: 3, pages: 3 }, summary);

        let read = |p: &str| fs::read_to_string(dir.path().join("_site").join(p)).unwrap();
        assert_eq!("Go Articles: Second First", read("tag/go/index.html"));
        assert_eq!(
            "Web Development Articles: First",
            read("tag/web-development/index.html")
        );
        assert_eq!("CI/CD Articles: Second", read("tag/ci/cd/index.html"));
        Ok(())
    }

    #[test]
    fn test_stale_tag_pages_removed() -> Result<()> {
        let dir = site();
        write(&dir, "_layouts/tag_page.html", "{{ .tag }}");
        write(&dir, "_site/tag/gone/index.html", "stale");
        write(&dir, "_site/index.html", "home");
        let config = Config::from_directory(dir.path(), None).unwrap();

        build_site(&config)?;
        assert!(!dir.path().join("_site/tag/gone").exists());
        assert!(dir.path().join("_site/index.html").exists());
        Ok(())
    }

    #[test]
    fn test_missing_layout_writes_nothing() -> Result<()> {
        let dir = site();
        write(&dir, "_layouts/post.html", "{{ .title }}");
        write(&dir, "_site/tag/kept/index.html", "untouched");
        let config = Config::from_directory(dir.path(), None).unwrap();

        let summary = build_site(&config)?;
        assert_eq!(Summary { posts: 3, pages: 0 }, summary);
        assert!(!dir.path().join("_site/tag/go").exists());
        assert!(dir.path().join("_site/tag/kept/index.html").exists());
        assert!(list_tag_pages(&config)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_list_tag_pages() -> Result<()> {
        let dir = site();
        write(&dir, "_layouts/tag_page.html", "");
        let config = Config::from_directory(dir.path(), None).unwrap();
        assert_eq!(
            vec![
                ("tag/go/".to_owned(), "Go Articles".to_owned()),
                (
                    "tag/web-development/".to_owned(),
                    "Web Development Articles".to_owned()
                ),
                ("tag/ci/cd/".to_owned(), "CI/CD Articles".to_owned()),
            ],
            list_tag_pages(&config)?
        );
        assert!(!dir.path().join("_site").exists());
        Ok(())
    }

    #[test]
    fn test_bad_post_fails_the_build() {
        let dir = site();
        write(&dir, "_layouts/tag_page.html", "");
        write(&dir, "_posts/2021-04-01-broken.md", "no front matter");
        let config = Config::from_directory(dir.path(), None).unwrap();
        assert!(matches!(build_site(&config), Err(Error::Parse(_))));
    }

    #[test]
    fn test_first_casing_follows_post_dates() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "_config.yml", "url: https://example.com\n");
        write(&dir, "_layouts/tag_page.html", "{{ .tag }}");
        // File names sort the other way round from the posts' dates.
        write(
            &dir,
            "_posts/2020-01-01-a.md",
            "---\ndate: \"2022-06-01\"\ntags: [Go]\n---\n",
        );
        write(&dir, "_posts/2021-01-01-b.md", "---\ntags: [go]\n---\n");
        let config = Config::from_directory(dir.path(), None).unwrap();

        build_site(&config)?;
        assert_eq!(
            "go",
            fs::read_to_string(dir.path().join("_site/tag/go/index.html")).unwrap()
        );
        Ok(())
    }

    #[test]
    fn test_conflicting_tag_paths_counted_once() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "_config.yml", "url: https://example.com\n");
        write(&dir, "_layouts/tag_page.html", "{{ .tag }}");
        write(
            &dir,
            "_posts/2021-01-01-a.md",
            "---\ntags: [Web Development, web-development]\n---\n",
        );
        let config = Config::from_directory(dir.path(), None).unwrap();

        assert_eq!(Summary { posts: 1, pages: 1 }, build_site(&config)?);
        assert_eq!(
            "Web Development",
            fs::read_to_string(dir.path().join("_site/tag/web-development/index.html")).unwrap()
        );
        Ok(())
    }
}
