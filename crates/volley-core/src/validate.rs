//! Structural validation of a response against its expectation.
//!
//! Validation is a straight pipeline; the first failure is the verdict:
//!
//! ```text
//! decode ──▶ existence (contains) ──▶ shape (json) ──▶ text
//! ```
//!
//! Shape checks only run for top-level keys present in both the decoded
//! document and the expectation. Keys the expectation does not mention are
//! ignored, so an expectation is a subset of the response, never a full
//! schema.

use crate::error::{Bound, ValidationError};
use crate::model::{ActualResponse, ExpectedValue, JNode, Response, ShapeMap};
use crate::path::{child_path, index_path, resolve};
use serde_json::{Map, Number, Value};
use tracing::debug;

/// Validates a raw response body against `expectation.body`.
pub fn validate(actual_body: &[u8], expectation: &Response) -> Result<(), ValidationError> {
    let document: Value = serde_json::from_slice(actual_body)?;

    check_contains(&document, &expectation.body.contains)?;

    if let (Some(shape), Some(root)) = (&expectation.body.json, document.as_object()) {
        for (key, node) in shape {
            if let Some(actual) = root.get(key) {
                validate_node(key, actual, node)?;
            }
        }
    }

    check_text(actual_body, expectation.body.text.as_deref())
}

/// Full verdict for a received response: status, then body.
///
/// JSON checks run when the server says the body is JSON or when the
/// expectation declares JSON fields; otherwise only the `text` check applies.
pub fn evaluate(response: &ActualResponse, expectation: &Response) -> Result<(), ValidationError> {
    if let Some(expected) = expectation.status
        && expected != response.status
    {
        return Err(ValidationError::StatusMismatch {
            expected,
            actual: response.status,
        });
    }

    if response.is_json() || expectation.body.expects_json() {
        validate(&response.body, expectation)
    } else {
        debug!("Non-JSON response, checking text expectation only");
        check_text(&response.body, expectation.body.text.as_deref())
    }
}

/// Every path must resolve to a non-null value.
fn check_contains(document: &Value, paths: &[String]) -> Result<(), ValidationError> {
    for path in paths {
        match resolve(document, path) {
            None => return Err(ValidationError::MissingField(path.clone())),
            Some(Value::Null) => return Err(ValidationError::NullField(path.clone())),
            Some(_) => {}
        }
    }
    Ok(())
}

fn check_text(body: &[u8], expected: Option<&str>) -> Result<(), ValidationError> {
    match expected {
        Some(text) if !String::from_utf8_lossy(body).contains(text) => {
            Err(ValidationError::TextMismatch(text.to_string()))
        }
        _ => Ok(()),
    }
}

/// Matches one actual value against its node. `field` is the qualified path.
fn validate_node(field: &str, actual: &Value, node: &JNode) -> Result<(), ValidationError> {
    if !actual.is_null()
        && let Some(expected) = node.json_type()
        && !expected.accepts(actual)
    {
        return Err(type_mismatch(field, expected));
    }

    match actual {
        Value::String(s) => validate_string(field, s, node),
        Value::Number(n) => validate_number(field, n, node),
        Value::Bool(b) => validate_bool(field, *b, node),
        Value::Object(map) => validate_object(field, map, &node.object),
        Value::Array(items) => validate_array(field, items, node),
        Value::Null => Err(ValidationError::UnsupportedType {
            field: field.to_string(),
            found: "null",
        }),
    }
}

/// Only a non-empty string `value` is compared; any other kind of `value` is
/// not checked against a string field.
fn validate_string(field: &str, actual: &str, node: &JNode) -> Result<(), ValidationError> {
    if let Some(ExpectedValue::String(expected)) = &node.value
        && !expected.is_empty()
        && expected != actual
    {
        return Err(ValidationError::ValueMismatch {
            field: field.to_string(),
            expected: format!("'{expected}'"),
            actual: format!("'{actual}'"),
        });
    }

    check_length(field, actual.chars().count(), node)
}

fn validate_number(field: &str, actual: &Number, node: &JNode) -> Result<(), ValidationError> {
    if let Some(ExpectedValue::Number(expected)) = &node.value
        && expected.as_f64() != actual.as_f64()
    {
        return Err(ValidationError::ValueMismatch {
            field: field.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }

    let value = actual.as_f64().unwrap_or(f64::NAN);
    if let Some(min) = node.min
        && value < min as f64
    {
        return Err(ValidationError::NumericBound {
            field: field.to_string(),
            bound: Bound::Min,
            limit: min,
            actual: value,
        });
    }
    if let Some(max) = node.max
        && value > max as f64
    {
        return Err(ValidationError::NumericBound {
            field: field.to_string(),
            bound: Bound::Max,
            limit: max,
            actual: value,
        });
    }
    Ok(())
}

fn validate_bool(field: &str, actual: bool, node: &JNode) -> Result<(), ValidationError> {
    match &node.value {
        Some(ExpectedValue::Bool(expected)) if *expected != actual => {
            Err(ValidationError::ValueMismatch {
                field: field.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Every expected key must exist and match; extra actual keys are ignored.
fn validate_object(
    field: &str,
    actual: &Map<String, Value>,
    expected: &ShapeMap,
) -> Result<(), ValidationError> {
    for (key, node) in expected {
        let path = child_path(field, key);
        let value = actual
            .get(key)
            .ok_or_else(|| ValidationError::MissingField(path.clone()))?;
        validate_node(&path, value, node)?;
    }
    Ok(())
}

/// A non-empty `list` fixes the array length; element `i` is matched as an
/// object against shape `i`.
fn validate_array(field: &str, items: &[Value], node: &JNode) -> Result<(), ValidationError> {
    check_length(field, items.len(), node)?;

    if node.list.is_empty() {
        return Ok(());
    }

    if items.len() != node.list.len() {
        return Err(ValidationError::ArrayLengthMismatch {
            field: field.to_string(),
            expected: node.list.len(),
            actual: items.len(),
        });
    }

    let empty = Map::new();
    for (index, (item, shape)) in items.iter().zip(&node.list).enumerate() {
        let element = item.as_object().unwrap_or(&empty);
        validate_object(&index_path(field, index), element, shape)?;
    }
    Ok(())
}

fn check_length(field: &str, len: usize, node: &JNode) -> Result<(), ValidationError> {
    if let Some(min) = node.min
        && (len as i64) < min
    {
        return Err(ValidationError::LengthBound {
            field: field.to_string(),
            bound: Bound::Min,
            limit: min,
            actual: len,
        });
    }
    if let Some(max) = node.max
        && (len as i64) > max
    {
        return Err(ValidationError::LengthBound {
            field: field.to_string(),
            bound: Bound::Max,
            limit: max,
            actual: len,
        });
    }
    Ok(())
}

fn type_mismatch(field: &str, expected: impl ToString) -> ValidationError {
    ValidationError::TypeMismatch {
        field: field.to_string(),
        expected: expected.to_string(),
    }
}
