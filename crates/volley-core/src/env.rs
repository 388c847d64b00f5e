//! Environment-variable substitution for scenario strings.
//!
//! A value is split on single spaces; every word that is exactly `$NAME`
//! (upper-case letters, digits, underscores) is replaced by the `env` map entry
//! for `NAME`, falling back to the process environment. Unknown names become
//! the empty string and are logged.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::warn;

fn env_word() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\$[A-Z0-9_]+$").expect("valid env pattern"))
}

/// Variables declared in a config document's `env` section.
pub type EnvMap = BTreeMap<String, String>;

/// Substitutes `$NAME` words using `env`, then the process environment.
pub fn resolve_string(raw: &str, env: &EnvMap) -> String {
    resolve_string_with(raw, env, |name| {
        std::env::var(name).ok().filter(|value| !value.is_empty())
    })
}

/// Like [`resolve_string`], with an explicit fallback lookup.
pub fn resolve_string_with<F>(raw: &str, env: &EnvMap, fallback: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    raw.split(' ')
        .map(|word| {
            if !env_word().is_match(word) {
                return word.to_string();
            }
            let name = &word[1..];
            if let Some(value) = env.get(name) {
                return value.clone();
            }
            if let Some(value) = fallback(name) {
                return value;
            }
            warn!("env var {} not found, replacing with empty string", name);
            String::new()
        })
        .collect::<Vec<_>>()
        .join(" ")
}
