//! Dotted/bracketed field paths.
//!
//! A path such as `items[1].id` names a field inside a decoded JSON document.
//! Segments are separated by `.`; a segment may end in a bracketed,
//! non-negative index (`items[1]`), meaning "look up `items`, then take
//! element 1 of that array". A segment with an empty key (`[0]`) indexes the
//! current array directly.
//!
//! ```
//! use serde_json::json;
//! use volley_core::path::resolve;
//!
//! let doc = json!({"items": [{"id": 1}, {"id": 2}]});
//! assert_eq!(resolve(&doc, "items[1].id"), Some(&json!(2)));
//! assert_eq!(resolve(&doc, "items[2].id"), None);
//! ```

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// `key[index]`, where `key` is any run of characters without brackets.
fn indexed_segment() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([^\[\]]*)\[(\d+)\]$").expect("valid segment pattern"))
}

/// One lookup step: a key, optionally followed by an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathToken {
    pub key: String,
    pub index: Option<usize>,
}

impl PathToken {
    /// Applies this token to `current`, returning the value it addresses.
    fn step<'a>(&self, current: &'a Value) -> Option<&'a Value> {
        let keyed = if self.key.is_empty() && self.index.is_some() {
            current
        } else {
            current.as_object()?.get(&self.key)?
        };

        match self.index {
            Some(index) => keyed.as_array()?.get(index),
            None => Some(keyed),
        }
    }
}

/// Splits a path into lookup tokens.
///
/// Segments that do not match `key[index]` are kept verbatim as plain keys,
/// so `a[x]` is the literal key `a[x]`.
pub fn parse_path(path: &str) -> Vec<PathToken> {
    path.split('.').map(parse_segment).collect()
}

fn parse_segment(segment: &str) -> PathToken {
    if let Some(caps) = indexed_segment().captures(segment)
        && let Ok(index) = caps[2].parse::<usize>()
    {
        return PathToken {
            key: caps[1].to_string(),
            index: Some(index),
        };
    }

    PathToken {
        key: segment.to_string(),
        index: None,
    }
}

/// Resolves `path` against `document`.
///
/// `None` means the path does not exist. A field that exists with a JSON
/// `null` value resolves to `Some(&Value::Null)`.
pub fn resolve<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    parse_path(path)
        .iter()
        .try_fold(document, |current, token| token.step(current))
}

/// Qualifies an object field under `prefix` (`prefix.key`).
pub fn child_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Qualifies a list element under `prefix` (`prefix[index]`).
pub fn index_path(prefix: &str, index: usize) -> String {
    format!("{prefix}[{index}]")
}
