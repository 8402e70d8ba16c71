//! Splits `---`-fenced YAML front matter from the rest of a document.

use serde_yaml::Mapping;
use std::fmt;

const FENCE: &str = "---";

/// Splits `input` into its front matter mapping and body. The input must
/// begin with a `---` fence and the front matter runs until the next line
/// that starts with `---`. The newline after the closing fence is not part
/// of the body.
pub fn parse(input: &str) -> Result<(Mapping, &str)> {
    if !input.starts_with(FENCE) {
        return Err(Error::MissingStartFence);
    }
    let (yaml, body) = split_after_start(input)?;
    Ok((mapping(yaml)?, body))
}

/// Like [`parse`], except a document without a leading fence is all body and
/// has empty front matter.
pub fn parse_optional(input: &str) -> Result<(Mapping, &str)> {
    if input.starts_with(FENCE) {
        parse(input)
    } else {
        Ok((Mapping::new(), input))
    }
}

fn split_after_start(input: &str) -> Result<(&str, &str)> {
    let rest = &input[FENCE.len()..];
    match rest.find("\n---") {
        None => Err(Error::MissingEndFence),
        Some(offset) => {
            let yaml = &rest[..offset + 1];
            let after_fence = &rest[offset + 1 + FENCE.len()..];
            // drop whatever trails the closing fence on its own line
            let body = match after_fence.find('\n') {
                Some(i) => &after_fence[i + 1..],
                None => "",
            };
            Ok((yaml, body))
        }
    }
}

fn mapping(yaml: &str) -> Result<Mapping> {
    if yaml.trim().is_empty() {
        return Ok(Mapping::new());
    }
    Ok(serde_yaml::from_str(yaml)?)
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem reading front matter.
#[derive(Debug)]
pub enum Error {
    /// Returned when a document that requires front matter doesn't begin
    /// with `---`.
    MissingStartFence,

    /// Returned when the opening fence was found but the closing one wasn't.
    MissingEndFence,

    /// Returned when the front matter isn't a YAML mapping.
    Yaml(serde_yaml::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingStartFence => write!(f, "front matter must begin with `---`"),
            Error::MissingEndFence => write!(f, "missing closing `---`"),
            Error::Yaml(err) => write!(f, "parsing front matter: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MissingStartFence => None,
            Error::MissingEndFence => None,
            Error::Yaml(err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`] so `?` works on
    /// deserialization.
    fn from(err: serde_yaml::Error) -> Error {
        Error::Yaml(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_yaml::Value;

    #[test]
    fn test_parse() -> Result<()> {
        let (data, body) = parse("---\ntitle: Hello\ntags: [a, b]\n---\n# Body\n")?;
        assert_eq!(
            Some(&Value::from("Hello")),
            data.get(&Value::from("title"))
        );
        assert_eq!("# Body\n", body);
        Ok(())
    }

    #[test]
    fn test_parse_empty_front_matter() -> Result<()> {
        let (data, body) = parse("---\n---\nbody")?;
        assert!(data.is_empty());
        assert_eq!("body", body);
        Ok(())
    }

    #[test]
    fn test_parse_dashes_inside_values() -> Result<()> {
        let (data, body) = parse("---\ntitle: a---b\n---\n")?;
        assert_eq!(
            Some(&Value::from("a---b")),
            data.get(&Value::from("title"))
        );
        assert_eq!("", body);
        Ok(())
    }

    #[test]
    fn test_missing_fences() {
        assert!(matches!(parse("title: x\n"), Err(Error::MissingStartFence)));
        assert!(matches!(
            parse("---\ntitle: x\n"),
            Err(Error::MissingEndFence)
        ));
    }

    #[test]
    fn test_not_a_mapping() {
        assert!(matches!(parse("---\n- a\n- b\n---\n"), Err(Error::Yaml(_))));
    }

    #[test]
    fn test_parse_optional() -> Result<()> {
        let (data, body) = parse_optional("<h1>{{ .title }}</h1>")?;
        assert!(data.is_empty());
        assert_eq!("<h1>{{ .title }}</h1>", body);

        let (data, body) = parse_optional("---\nlayout: default\n---\n<ul></ul>")?;
        assert_eq!(1, data.len());
        assert_eq!("<ul></ul>", body);
        Ok(())
    }
}
