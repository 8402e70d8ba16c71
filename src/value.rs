//! Conversions into template [`Value`]s.

use crate::post::Post;
use gtmpl::Value;
use serde_yaml::{Mapping, Value as Yaml};
use std::collections::HashMap;

/// Converts front matter data into a template value. Mapping keys that aren't
/// strings, numbers or booleans are dropped.
pub fn from_yaml(yaml: &Yaml) -> Value {
    match yaml {
        Yaml::Null => Value::Nil,
        Yaml::Bool(b) => Value::Bool(*b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64().map_or(Value::Nil, Value::from)
            }
        }
        Yaml::String(s) => Value::String(s.clone()),
        Yaml::Sequence(items) => Value::Array(items.iter().map(from_yaml).collect()),
        Yaml::Mapping(mapping) => Value::Object(object(mapping)),
    }
}

/// Converts a front matter mapping into the fields of a template object.
pub fn object(mapping: &Mapping) -> HashMap<String, Value> {
    mapping
        .iter()
        .filter_map(|(k, v)| key(k).map(|k| (k, from_yaml(v))))
        .collect()
}

fn key(yaml: &Yaml) -> Option<String> {
    match yaml {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Number(n) => Some(n.to_string()),
        Yaml::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl From<&Post> for Value {
    /// Converts a [`Post`] into a template object with fields `id`, `title`,
    /// `url`, `url_path`, `date` (`YYYY-MM-DD`), `tags` and `data` (the full
    /// front matter).
    fn from(post: &Post) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("id".to_owned(), Value::String(post.id.clone()));
        m.insert("title".to_owned(), Value::String(post.title.clone()));
        m.insert("url".to_owned(), Value::String(post.url.to_string()));
        m.insert("url_path".to_owned(), Value::String(post.url_path.clone()));
        m.insert(
            "date".to_owned(),
            Value::String(post.date.format("%Y-%m-%d").to_string()),
        );
        m.insert(
            "tags".to_owned(),
            Value::Array(post.tags.iter().map(|t| Value::String(t.clone())).collect()),
        );
        m.insert("data".to_owned(), Value::Object(object(&post.data)));
        Value::Object(m)
    }
}
