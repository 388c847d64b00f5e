//! Load-time normalization of scenario expectations.
//!
//! Normalization walks an expected-shape tree once and produces a new tree:
//!
//! - string literals in leaf `value`s go through [`resolve_string`],
//! - every leaf path is added to the body's `contains` list (once, after the
//!   explicitly declared entries),
//! - raw objects/arrays written into `value` are reported as warnings.
//!
//! `normalize_object` and `normalize_list` recurse into each other and
//! never mutate their input, so sibling fields are always preserved.

use crate::env::{EnvMap, resolve_string};
use crate::model::{Body, ExpectedValue, JNode, Scenario, ShapeMap};
use crate::path::{child_path, index_path};
use serde_json::Value;
use std::fmt;

/// What was embedded in a `value` by mistake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddedKind {
    Object,
    List,
}

/// Advisory diagnostic produced during normalization. Never changes a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeWarning {
    pub scenario: String,
    pub field: String,
    pub kind: EmbeddedKind,
}

impl fmt::Display for NormalizeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (what, key) = match self.kind {
            EmbeddedKind::Object => ("object", "object"),
            EmbeddedKind::List => ("array", "list"),
        };
        write!(
            f,
            "scenario {:?}: field {:?} has embedded {} in 'value'. Use '{}' instead.",
            self.scenario, self.field, what, key
        )
    }
}

/// Result of normalizing one body expectation.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// Body with substituted values and `contains` = explicit ∪ implied.
    pub body: Body,
    /// Paths derived from the shape tree, in traversal order.
    pub implied: Vec<String>,
    pub warnings: Vec<NormalizeWarning>,
}

/// State threaded through one traversal.
pub(crate) struct Walk<'a> {
    scenario: &'a str,
    env: &'a EnvMap,
    explicit: &'a [String],
    implied: Vec<String>,
    warnings: Vec<NormalizeWarning>,
}

impl<'a> Walk<'a> {
    fn new(scenario: &'a str, env: &'a EnvMap, explicit: &'a [String]) -> Self {
        Self {
            scenario,
            env,
            explicit,
            implied: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn imply(&mut self, path: &str) {
        let known = self.explicit.iter().any(|p| p == path) || self.implied.iter().any(|p| p == path);
        if !known {
            self.implied.push(path.to_string());
        }
    }

    fn warn(&mut self, field: &str, kind: EmbeddedKind) {
        self.warnings.push(NormalizeWarning {
            scenario: self.scenario.to_string(),
            field: field.to_string(),
            kind,
        });
    }
}

/// Normalizes a body expectation for `scenario`.
pub fn normalize_body(scenario: &str, body: &Body, env: &EnvMap) -> Normalized {
    let mut walk = Walk::new(scenario, env, &body.contains);
    let json = body
        .json
        .as_ref()
        .map(|shape| normalize_object(&mut walk, "", shape));

    let Walk {
        implied, warnings, ..
    } = walk;

    let mut contains = body.contains.clone();
    contains.extend(implied.iter().cloned());

    Normalized {
        body: Body {
            contains,
            json,
            text: body.text.clone(),
        },
        implied,
        warnings,
    }
}

/// Normalizes every field of an object shape under `prefix`.
pub(crate) fn normalize_object(walk: &mut Walk<'_>, prefix: &str, shape: &ShapeMap) -> ShapeMap {
    shape
        .iter()
        .map(|(key, node)| {
            let path = child_path(prefix, key);
            (key.clone(), normalize_node(walk, &path, node))
        })
        .collect()
}

/// Normalizes every element shape of a list under `prefix`.
pub(crate) fn normalize_list(walk: &mut Walk<'_>, prefix: &str, elements: &[ShapeMap]) -> Vec<ShapeMap> {
    elements
        .iter()
        .enumerate()
        .map(|(index, element)| normalize_object(walk, &index_path(prefix, index), element))
        .collect()
}

fn normalize_node(walk: &mut Walk<'_>, path: &str, node: &JNode) -> JNode {
    let object = normalize_object(walk, path, &node.object);
    let list = normalize_list(walk, path, &node.list);

    let mut value = node.value.clone();
    if node.is_leaf() {
        match &node.value {
            Some(ExpectedValue::String(raw)) => {
                value = Some(ExpectedValue::String(resolve_string(raw, walk.env)));
            }
            Some(ExpectedValue::Embedded(Value::Object(_))) => walk.warn(path, EmbeddedKind::Object),
            Some(ExpectedValue::Embedded(Value::Array(_))) => walk.warn(path, EmbeddedKind::List),
            _ => {}
        }
        walk.imply(path);
    }

    JNode {
        value,
        object,
        list,
        ..node.clone()
    }
}

/// Normalizes a whole scenario: headers, top-level JSON request strings and
/// the response body expectation.
pub fn normalize_scenario(
    name: &str,
    scenario: &Scenario,
    env: &EnvMap,
) -> (Scenario, Vec<NormalizeWarning>) {
    let mut normalized = scenario.clone();

    for value in normalized.headers.values_mut() {
        *value = resolve_string(value, env);
    }

    if let Some(json) = normalized.request.json.as_mut() {
        for value in json.values_mut() {
            if let Value::String(raw) = value {
                *raw = resolve_string(raw, env);
            }
        }
    }

    let Normalized { body, warnings, .. } = normalize_body(name, &scenario.response.body, env);
    normalized.response.body = body;

    (normalized, warnings)
}
