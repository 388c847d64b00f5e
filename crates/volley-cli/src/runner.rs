//! Scenario orchestration.
//!
//! The TestRunner walks every route of a loaded [`Config`], sends one request
//! per scenario and evaluates the response. Runs are strictly sequential.
//!
//! # Example
//!
//! ```no_run
//! use volley_cli::{ConfigSource, ReqwestClient, RunConfig, TestRunner, load_config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config(&ConfigSource::parse("volley.yml"), None).await?;
//!     let runner = TestRunner::new(config, Box::new(ReqwestClient::new()?));
//!     let results = runner.run(&RunConfig::new()).await?;
//!
//!     println!("Passed: {}", results.passed_count());
//!     Ok(())
//! }
//! ```

use crate::http::{HttpClient, PreparedRequest};
use serde::Serialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};
use volley_core::{Config, Route, evaluate};

/// Run-level errors. Scenario failures never surface here.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// No scenarios matched the filter.
    #[error("no scenarios matched filter: {0}")]
    NoMatchingScenarios(String),
}

/// Configuration for a test run.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Filter by pattern (matches scenario name, path template or method).
    pub filter: Option<String>,
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter pattern.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    fn matches(&self, route: &Route, scenario: &str) -> bool {
        let Some(filter) = &self.filter else {
            return true;
        };
        let filter = filter.to_lowercase();
        scenario.to_lowercase().contains(&filter)
            || route.template.to_lowercase().contains(&filter)
            || route.method.to_lowercase() == filter
    }
}

/// How one scenario ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    Passed,
    /// The response did not match the expectation.
    Failed { kind: String, message: String },
    /// No response to judge: the request could not be built or sent.
    Errored { message: String },
}

/// Result of a single scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub scenario: String,
    pub method: String,
    /// The path template, e.g. `/users/{id}`.
    pub endpoint: String,
    /// Received status code, when a response arrived.
    pub status: Option<u16>,
    #[serde(flatten)]
    pub outcome: ScenarioOutcome,
    #[serde(serialize_with = "serialize_millis", rename = "duration_ms")]
    pub duration: Duration,
}

impl ScenarioResult {
    pub fn passed(&self) -> bool {
        self.outcome == ScenarioOutcome::Passed
    }
}

fn serialize_millis<S: serde::Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Aggregated results from a test run.
#[derive(Debug, Clone, Default)]
pub struct RunResults {
    /// Individual scenario results, in run order.
    pub results: Vec<ScenarioResult>,

    /// Total duration of the run.
    pub duration: Duration,

    /// Scenarios referenced by a route but not defined.
    pub skipped: Vec<String>,
}

impl RunResults {
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    /// Failed or errored.
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed()).count()
    }

    pub fn total_count(&self) -> usize {
        self.results.len()
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(ScenarioResult::passed)
    }

    pub fn failures(&self) -> Vec<&ScenarioResult> {
        self.results.iter().filter(|r| !r.passed()).collect()
    }
}

/// Progress callback for run updates.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Events emitted during a run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    RunStarted { total_scenarios: usize },

    /// A request is about to be sent.
    ScenarioStarted {
        scenario: String,
        method: String,
        endpoint: String,
    },

    ScenarioCompleted { result: ScenarioResult },

    /// A route referenced a scenario that is not defined.
    ScenarioSkipped { scenario: String, reason: String },

    RunCompleted { results: RunResults },
}

/// Runs the scenarios of a [`Config`] against a live server.
pub struct TestRunner {
    config: Config,
    client: Box<dyn HttpClient>,
    on_progress: Option<ProgressCallback>,
}

impl TestRunner {
    pub fn new(config: Config, client: Box<dyn HttpClient>) -> Self {
        Self {
            config,
            client,
            on_progress: None,
        }
    }

    /// Sets a callback for progress updates.
    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// `(route, scenario)` pairs selected by `config`, in run order.
    pub fn matching_scenarios<'a>(&'a self, config: &RunConfig) -> Vec<(&'a Route, &'a str)> {
        self.config
            .routes
            .iter()
            .flat_map(|route| route.scenarios.iter().map(move |name| (route, name.as_str())))
            .filter(|(route, name)| config.matches(route, name))
            .collect()
    }

    /// Runs every matching scenario, one request at a time.
    pub async fn run(&self, config: &RunConfig) -> Result<RunResults, RunnerError> {
        let start = Instant::now();
        let matching = self.matching_scenarios(config);

        if let Some(filter) = &config.filter
            && matching.is_empty()
        {
            return Err(RunnerError::NoMatchingScenarios(filter.clone()));
        }

        self.emit_progress(ProgressEvent::RunStarted {
            total_scenarios: matching.len(),
        });

        let mut results = Vec::new();
        let mut skipped = Vec::new();

        for (route, name) in matching {
            if self.config.scenario(name).is_none() {
                info!("Scenario {} is not defined, skipping", name);
                self.emit_progress(ProgressEvent::ScenarioSkipped {
                    scenario: name.to_string(),
                    reason: format!("not defined (referenced by {} {})", route.method, route.template),
                });
                skipped.push(name.to_string());
                continue;
            }

            self.emit_progress(ProgressEvent::ScenarioStarted {
                scenario: name.to_string(),
                method: route.method.clone(),
                endpoint: route.template.clone(),
            });

            let result = self.run_scenario(route, name).await;
            debug!("{} {} [{}]: {:?}", route.method, route.template, name, result.outcome);

            self.emit_progress(ProgressEvent::ScenarioCompleted {
                result: result.clone(),
            });
            results.push(result);
        }

        let run_results = RunResults {
            results,
            duration: start.elapsed(),
            skipped,
        };

        self.emit_progress(ProgressEvent::RunCompleted {
            results: run_results.clone(),
        });

        Ok(run_results)
    }

    async fn run_scenario(&self, route: &Route, name: &str) -> ScenarioResult {
        let start = Instant::now();
        let mut status = None;

        let outcome = match self.config.scenario(name) {
            None => ScenarioOutcome::Errored {
                message: format!("scenario {name} is not defined"),
            },
            Some(scenario) => {
                match PreparedRequest::from_scenario(&self.config.host, route, scenario) {
                    Err(e) => ScenarioOutcome::Errored {
                        message: e.to_string(),
                    },
                    Ok(request) => match self.client.send(&request).await {
                        Err(e) => ScenarioOutcome::Errored {
                            message: e.to_string(),
                        },
                        Ok(response) => {
                            status = Some(response.status);
                            match evaluate(&response, &scenario.response) {
                                Ok(()) => ScenarioOutcome::Passed,
                                Err(e) => ScenarioOutcome::Failed {
                                    kind: e.kind().to_string(),
                                    message: e.to_string(),
                                },
                            }
                        }
                    },
                }
            }
        };

        ScenarioResult {
            scenario: name.to_string(),
            method: route.method.clone(),
            endpoint: route.template.clone(),
            status,
            outcome,
            duration: start.elapsed(),
        }
    }

    /// Emits a progress event if a callback is registered.
    fn emit_progress(&self, event: ProgressEvent) {
        if let Some(callback) = &self.on_progress {
            callback(event);
        }
    }
}
