//! # volley-cli
//!
//! Runs Volley functional API tests against a live server.
//!
//! This crate provides:
//! - Reading configuration documents from files or URLs
//! - Building and sending one HTTP request per scenario
//! - Sequential orchestration with progress events
//! - Terminal and JSON reporting
//!
//! The `volley` binary wires these together; the pieces are public so other
//! harnesses can drive a run with their own [`HttpClient`].

pub mod http;
pub mod reporter;
pub mod runner;
pub mod source;

pub use http::{
    HttpClient, HttpError, PreparedRequest, REQUEST_TIMEOUT, ReqwestClient, build_url,
    replace_path_params,
};
pub use reporter::{
    JsonReporter, ReportSummary, ReporterError, RunReport, TerminalReporter, Verbosity,
    create_progress_callback,
};
pub use runner::{
    ProgressCallback, ProgressEvent, RunConfig, RunResults, RunnerError, ScenarioOutcome,
    ScenarioResult, TestRunner,
};
pub use source::{ConfigSource, LoadError, SourceError, load_config};

/// Crate version, reported in JSON output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
