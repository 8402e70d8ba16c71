//! The library code for `tagpages`, which generates one index page per tag
//! for a Jekyll-style blog. A generation pass breaks down into three steps:
//!
//! 1. Loading the site: its posts ([`crate::parser`]) and its layouts
//!    ([`crate::layout`])
//! 2. Deriving the tag pages from the posts' tags ([`crate::tag`])
//! 3. Rendering the tag pages to disk ([`crate::write`])
//!
//! The second step is the heart of it. Tags are free text, so `Rust`, `rust`
//! and `RUST` are all the same tag; the casing used on the page is whichever
//! one the oldest post used. Each tag gets a page at `tag/{slug}/`, where the
//! slug is the lowercased tag with spaces replaced by hyphens. If the site has
//! no `tag_page` layout, the second step produces nothing and nothing is
//! written.
//!
//! [`crate::build::build_site`] runs all three steps.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod frontmatter;
pub mod layout;
pub mod logging;
pub mod parser;
pub mod post;
pub mod tag;
pub mod value;
pub mod write;
