//! Scenario and expectation data model.
//!
//! These types mirror the YAML configuration keys one to one (`value`, `type`,
//! `min`, `max`, `contains`, `object`, `list`, `json`, `text`, `status`), so
//! existing config files deserialize unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Expected shape of a JSON object: field name to node.
pub type ShapeMap = BTreeMap<String, JNode>;

/// A named HTTP request plus its expected response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Values for `{param}` placeholders in the route template.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub request: RequestBody,

    #[serde(default)]
    pub response: Response,
}

/// Request payload: a JSON object or raw text, never both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<serde_json::Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Expected response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    #[serde(default)]
    pub body: Body,
}

/// Expected response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Paths that must exist and be non-null. After normalization this also
    /// holds every leaf path of `json`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contains: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<ShapeMap>,

    /// Substring the raw body must include.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Body {
    /// True when the body carries JSON expectations (shape or paths).
    pub fn expects_json(&self) -> bool {
        !self.contains.is_empty() || self.json.as_ref().is_some_and(|json| !json.is_empty())
    }
}

/// Declarative expectation for one JSON field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ExpectedValue>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,

    /// Carried for config compatibility; not checked by the comparator.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contains: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub object: ShapeMap,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub list: Vec<ShapeMap>,
}

/// Which structural role a node plays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeKind<'a> {
    Leaf,
    Object(&'a ShapeMap),
    List(&'a [ShapeMap]),
}

impl JNode {
    /// Node expecting exactly `value`.
    pub fn value(value: impl Into<ExpectedValue>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Node expecting a value of the named JSON type.
    pub fn typed(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::default()
        }
    }

    /// Node expecting an object with the given fields.
    pub fn object(fields: ShapeMap) -> Self {
        Self {
            object: fields,
            ..Self::default()
        }
    }

    /// Node expecting an array whose elements match `elements` one to one.
    pub fn list(elements: Vec<ShapeMap>) -> Self {
        Self {
            list: elements,
            ..Self::default()
        }
    }

    pub fn with_bounds(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// A leaf has neither a populated `object` nor a populated `list`.
    pub fn is_leaf(&self) -> bool {
        self.object.is_empty() && self.list.is_empty()
    }

    /// Structural role. `object` wins when both are populated, which
    /// config loading rejects.
    pub fn kind(&self) -> ShapeKind<'_> {
        if !self.object.is_empty() {
            ShapeKind::Object(&self.object)
        } else if !self.list.is_empty() {
            ShapeKind::List(&self.list)
        } else {
            ShapeKind::Leaf
        }
    }

    /// Declared `type`, if it names a known JSON type.
    pub fn json_type(&self) -> Option<JsonType> {
        self.type_name.as_deref().and_then(|name| name.parse().ok())
    }
}

/// Literal in a node's `value`.
///
/// `Embedded` holds a raw object or array written where `object`/`list` was
/// meant. It never participates in comparisons; normalization warns about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpectedValue {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Embedded(Value),
}

impl ExpectedValue {
    /// JSON type of the literal.
    pub fn json_type(&self) -> JsonType {
        match self {
            ExpectedValue::Bool(_) => JsonType::Boolean,
            ExpectedValue::Number(_) => JsonType::Number,
            ExpectedValue::String(_) => JsonType::String,
            ExpectedValue::Embedded(value) => JsonType::of(value).unwrap_or(JsonType::Object),
        }
    }
}

impl From<&str> for ExpectedValue {
    fn from(value: &str) -> Self {
        ExpectedValue::String(value.to_string())
    }
}

impl From<String> for ExpectedValue {
    fn from(value: String) -> Self {
        ExpectedValue::String(value)
    }
}

impl From<bool> for ExpectedValue {
    fn from(value: bool) -> Self {
        ExpectedValue::Bool(value)
    }
}

impl From<i64> for ExpectedValue {
    fn from(value: i64) -> Self {
        ExpectedValue::Number(value.into())
    }
}

impl From<i32> for ExpectedValue {
    fn from(value: i32) -> Self {
        ExpectedValue::Number(value.into())
    }
}

/// JSON type names accepted in a node's `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl JsonType {
    /// Type of a decoded value; `None` for `null`.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => Some(JsonType::String),
            Value::Number(_) => Some(JsonType::Number),
            Value::Bool(_) => Some(JsonType::Boolean),
            Value::Object(_) => Some(JsonType::Object),
            Value::Array(_) => Some(JsonType::Array),
            Value::Null => None,
        }
    }

    /// Whether `value` satisfies this type.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (JsonType::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (expected, actual) => JsonType::of(actual) == Some(expected),
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JsonType::String => "string",
            JsonType::Number => "number",
            JsonType::Integer => "integer",
            JsonType::Boolean => "boolean",
            JsonType::Object => "object",
            JsonType::Array => "array",
        };
        write!(f, "{name}")
    }
}

impl FromStr for JsonType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(JsonType::String),
            "number" => Ok(JsonType::Number),
            "integer" => Ok(JsonType::Integer),
            "boolean" | "bool" => Ok(JsonType::Boolean),
            "object" => Ok(JsonType::Object),
            "array" | "list" => Ok(JsonType::Array),
            other => Err(format!("unknown type: {other}")),
        }
    }
}

/// A route: method + URL template bound to the scenarios run against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    /// Upper-case HTTP method.
    pub method: String,
    /// Path template with `{param}` placeholders, e.g. `/users/{id}`.
    pub template: String,
    pub scenarios: Vec<String>,
}

/// A response as received from the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActualResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ActualResponse {
    /// All `Content-Type` header values (case-insensitive name match).
    pub fn content_types(&self) -> impl Iterator<Item = &str> {
        self.headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str())
    }

    /// True when any `Content-Type` value mentions `application/json`.
    pub fn is_json(&self) -> bool {
        self.content_types()
            .any(|value| value.contains("application/json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_jnode_deserializes_yaml_keys() {
        let yaml = r"
value: Alice
type: string
min: 1
max: 10
contains: [Al]
";
        let node: JNode = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(node.value, Some(ExpectedValue::String("Alice".to_string())));
        assert_eq!(node.type_name.as_deref(), Some("string"));
        assert_eq!(node.min, Some(1));
        assert_eq!(node.max, Some(10));
        assert_eq!(node.contains, vec!["Al".to_string()]);
        assert!(node.is_leaf());
    }

    #[test]
    fn test_expected_value_variants() {
        let node: JNode = serde_yaml::from_str("value: 5").unwrap();
        assert!(matches!(node.value, Some(ExpectedValue::Number(_))));

        let node: JNode = serde_yaml::from_str("value: true").unwrap();
        assert_eq!(node.value, Some(ExpectedValue::Bool(true)));

        let node: JNode = serde_yaml::from_str("value: {a: 1}").unwrap();
        assert!(matches!(node.value, Some(ExpectedValue::Embedded(Value::Object(_)))));

        let node: JNode = serde_yaml::from_str("value: [1, 2]").unwrap();
        assert!(matches!(node.value, Some(ExpectedValue::Embedded(Value::Array(_)))));
    }

    #[test]
    fn test_shape_kind() {
        let yaml = r"
object:
  email:
    type: string
";
        let node: JNode = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(node.kind(), ShapeKind::Object(fields) if fields.contains_key("email")));

        let yaml = r"
list:
  - id: {value: 1}
  - id: {value: 2}
";
        let node: JNode = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(node.kind(), ShapeKind::List(items) if items.len() == 2));

        assert_eq!(JNode::default().kind(), ShapeKind::Leaf);
    }

    #[test]
    fn test_json_type_accepts() {
        assert!(JsonType::Number.accepts(&json!(1.5)));
        assert!(JsonType::Integer.accepts(&json!(3)));
        assert!(!JsonType::Integer.accepts(&json!(3.5)));
        assert!(JsonType::Array.accepts(&json!([])));
        assert!(!JsonType::String.accepts(&json!(1)));
        assert_eq!("bool".parse::<JsonType>(), Ok(JsonType::Boolean));
        assert_eq!("list".parse::<JsonType>(), Ok(JsonType::Array));
        assert!("date".parse::<JsonType>().is_err());
    }

    #[test]
    fn test_actual_response_content_type() {
        let response = ActualResponse {
            status: 200,
            headers: vec![(
                "Content-Type".to_string(),
                "application/json; charset=utf-8".to_string(),
            )],
            body: b"{}".to_vec(),
        };
        assert!(response.is_json());

        let response = ActualResponse {
            headers: vec![("content-type".to_string(), "text/plain".to_string())],
            ..ActualResponse::default()
        };
        assert!(!response.is_json());
    }

    #[test]
    fn test_body_expects_json() {
        assert!(!Body::default().expects_json());
        let body = Body {
            contains: vec!["id".to_string()],
            ..Body::default()
        };
        assert!(body.expects_json());
    }
}
