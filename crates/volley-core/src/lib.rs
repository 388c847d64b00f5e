//! # volley-core
//!
//! Core of the Volley functional API test runner.
//!
//! This crate provides:
//! - Dotted/bracketed path addressing into decoded JSON documents
//! - The scenario and expected-shape model, deserialized from YAML
//! - Load-time normalization (env substitution, implied field paths)
//! - Structural validation of a response against its expectation
//! - Configuration document parsing and merging
//!
//! Everything here is synchronous and performs no I/O; fetching documents and
//! sending requests live in `volley-cli`.

pub mod config;
pub mod env;
mod error;
pub mod model;
pub mod normalize;
pub mod path;
pub mod validate;

pub use config::{Config, MainDocument, OpenApiDocument};
pub use env::{EnvMap, resolve_string};
pub use error::{Bound, ConfigError, ValidationError};
pub use model::{
    ActualResponse, Body, ExpectedValue, JNode, JsonType, RequestBody, Response, Route, Scenario,
    ShapeKind, ShapeMap,
};
pub use normalize::{EmbeddedKind, NormalizeWarning, Normalized, normalize_body, normalize_scenario};
pub use path::{PathToken, parse_path, resolve};
pub use validate::{evaluate, validate};
