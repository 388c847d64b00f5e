//! Error types for configuration loading and response validation.

use std::fmt;
use thiserror::Error;

/// Which side of an inclusive bound was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Min,
    Max,
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Min => write!(f, "at least"),
            Bound::Max => write!(f, "at most"),
        }
    }
}

/// A scenario-scoped validation failure.
///
/// Every variant is soft: the runner reports the scenario as failed and moves
/// on to the next one. Field names are fully qualified paths such as
/// `user.email` or `items[1].id`.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid JSON response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("expected {0} to exist, but it does NOT")]
    MissingField(String),

    #[error("expected {0} to exist, but it is NULL")]
    NullField(String),

    #[error("invalid type expected {field} to be {expected}")]
    TypeMismatch { field: String, expected: String },

    /// `expected` and `actual` are already rendered (strings are quoted).
    #[error("expected {field} to be {expected}, got {actual}")]
    ValueMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("expected {field} to have length {bound} {limit}, got {actual}")]
    LengthBound {
        field: String,
        bound: Bound,
        limit: i64,
        actual: usize,
    },

    #[error("expected {field} to be {bound} {limit}, got {actual}")]
    NumericBound {
        field: String,
        bound: Bound,
        limit: i64,
        actual: f64,
    },

    #[error("{field}: array length mismatch (expected {expected}, got {actual})")]
    ArrayLengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("unsupported type at {field}: {found}")]
    UnsupportedType { field: String, found: &'static str },

    #[error("expected {0:?} in response body, but not found")]
    TextMismatch(String),

    #[error("status mismatch (expected {expected}, got {actual})")]
    StatusMismatch { expected: u16, actual: u16 },
}

impl ValidationError {
    /// Stable machine-readable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::Decode(_) => "decode",
            ValidationError::MissingField(_) => "missing_field",
            ValidationError::NullField(_) => "null_field",
            ValidationError::TypeMismatch { .. } => "type_mismatch",
            ValidationError::ValueMismatch { .. } => "value_mismatch",
            ValidationError::LengthBound { .. } => "length_bound",
            ValidationError::NumericBound { .. } => "numeric_bound",
            ValidationError::ArrayLengthMismatch { .. } => "array_length_mismatch",
            ValidationError::UnsupportedType { .. } => "unsupported_type",
            ValidationError::TextMismatch(_) => "text_mismatch",
            ValidationError::StatusMismatch { .. } => "status_mismatch",
        }
    }

    /// The qualified field the failure refers to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::MissingField(field) | ValidationError::NullField(field) => Some(field),
            ValidationError::TypeMismatch { field, .. }
            | ValidationError::ValueMismatch { field, .. }
            | ValidationError::LengthBound { field, .. }
            | ValidationError::NumericBound { field, .. }
            | ValidationError::ArrayLengthMismatch { field, .. }
            | ValidationError::UnsupportedType { field, .. } => Some(field),
            ValidationError::Decode(_)
            | ValidationError::TextMismatch(_)
            | ValidationError::StatusMismatch { .. } => None,
        }
    }
}

/// Errors raised while building a [`Config`](crate::Config) from documents.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse {document}: {source}")]
    Parse {
        document: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("scenario {scenario:?}: field {path:?} declares both 'object' and 'list'")]
    ConflictingShape { scenario: String, path: String },

    #[error("scenario {scenario:?}: field {path:?} has unknown type {name:?}")]
    UnknownType {
        scenario: String,
        path: String,
        name: String,
    },

    #[error("scenario {scenario:?}: field {path:?} has min {min} greater than max {max}")]
    InvalidBounds {
        scenario: String,
        path: String,
        min: i64,
        max: i64,
    },

    #[error("scenario {0:?}: request declares both 'json' and 'text'")]
    ConflictingRequestBody(String),
}
