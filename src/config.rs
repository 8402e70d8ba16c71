//! Locates and parses a site's `_config.yml` into a resolved [`Config`].

use crate::tag::{Generator, SlugMode, TAG_LAYOUT};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use crate::write::is_contained;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

const PROJECT_FILE: &str = "_config.yml";

const DEFAULT_URL: &str = "http://localhost:4000";

#[derive(Deserialize)]
#[serde(default)]
struct Project {
    url: Option<Url>,
    baseurl: String,
    destination: PathBuf,
    future: bool,
    tag_pages: TagPages,
}

impl Default for Project {
    fn default() -> Self {
        Project {
            url: None,
            baseurl: String::new(),
            destination: PathBuf::from("_site"),
            future: false,
            tag_pages: TagPages::default(),
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct TagPages {
    layout: String,
    dir: String,
    slug: SlugMode,
    skip_blank: bool,
}

impl Default for TagPages {
    fn default() -> Self {
        let generator = Generator::default();
        TagPages {
            layout: TAG_LAYOUT.to_owned(),
            dir: generator.dir,
            slug: generator.slug,
            skip_blank: generator.skip_blank,
        }
    }
}

/// Everything a generation pass needs to know about a site.
#[derive(Clone, Debug)]
pub struct Config {
    /// The directory holding `_config.yml`, `_posts` and `_layouts`.
    pub root_directory: PathBuf,
    pub posts_source_directory: PathBuf,
    pub layouts_directory: PathBuf,
    pub output_directory: PathBuf,

    /// `url` joined with `baseurl`, always ending in a slash.
    pub site_root: Url,

    /// Whether posts dated in the future are included.
    pub future: bool,

    /// The name of the layout tag pages are rendered with.
    pub tag_layout: String,

    pub generator: Generator,
}

impl Config {
    /// Searches `dir` and then each of its parents for `_config.yml`. If none
    /// is found, `dir` is treated as the site root with default settings.
    /// `output_directory` overrides the configured `destination`.
    pub fn from_directory(dir: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let start = dir
            .canonicalize()
            .with_context(|| format!("Resolving site directory `{}`", dir.display()))?;

        let mut current: Option<&Path> = Some(&start);
        while let Some(candidate) = current {
            let path = candidate.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path, output_directory)
                    .context("Loading configuration");
            }
            current = candidate.parent();
        }

        debug!(dir = %start.display(), "no `{}` found; using defaults", PROJECT_FILE);
        Config::resolve(Project::default(), &start, output_directory)
    }

    pub fn from_project_file(path: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Opening project file `{}`", path.display()))?;
        let project: Project = if contents.trim().is_empty() {
            Project::default()
        } else {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Parsing project file `{}`", path.display()))?
        };
        match path.parent() {
            None => Err(anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )),
            Some(project_root) => Config::resolve(project, project_root, output_directory),
        }
    }

    fn resolve(
        project: Project,
        project_root: &Path,
        output_directory: Option<&Path>,
    ) -> Result<Config> {
        let Project {
            url,
            baseurl,
            destination,
            future,
            tag_pages,
        } = project;

        let base = baseurl.trim_matches('/');
        let base_path = if base.is_empty() {
            String::from("/")
        } else {
            format!("/{}/", base)
        };
        let url = match url {
            Some(url) => url,
            None => Url::parse(DEFAULT_URL)?,
        };
        let site_root = url
            .join(&base_path)
            .with_context(|| format!("Joining baseurl `{}` onto `{}`", baseurl, url))?;

        // The tag directory is cleaned before every build, so it has to be a
        // real subdirectory of the output directory.
        let dir = tag_pages.dir.trim_matches('/');
        if !is_contained(Path::new(dir)) {
            return Err(anyhow!(
                "`tag_pages.dir` must be a relative subdirectory of the output directory, got `{}`",
                tag_pages.dir
            ));
        }

        Ok(Config {
            root_directory: project_root.to_owned(),
            posts_source_directory: project_root.join("_posts"),
            layouts_directory: project_root.join("_layouts"),
            output_directory: match output_directory {
                Some(dir) => dir.to_owned(),
                None => project_root.join(destination),
            },
            site_root,
            future,
            tag_layout: tag_pages.layout,
            generator: Generator {
                dir: dir.to_owned(),
                slug: tag_pages.slug,
                skip_blank: tag_pages.skip_blank,
            },
        })
    }
}
