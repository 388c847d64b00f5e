//! Reporters for run results.
//!
//! - `TerminalReporter`: colored progress lines, a spinner while a request is
//!   in flight, and the final summary
//! - `JsonReporter`: machine-readable report for CI
//!
//! `volley list` and `volley check` output also lives here so the core crate
//! never prints.

use crate::runner::{ProgressCallback, ProgressEvent, RunResults, ScenarioOutcome, ScenarioResult};
use chrono::{DateTime, Utc};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use volley_core::Config;

/// Errors that can occur while producing a report.
#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("failed to serialize report: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Verbosity level for terminal output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Only the pass/fail summary.
    Quiet,
    #[default]
    Normal,
    /// Also prints each request before it is sent.
    Verbose,
}

/// Terminal reporter for run progress and results.
pub struct TerminalReporter {
    verbosity: Verbosity,

    /// Spinner for the request in flight.
    spinner: Option<ProgressBar>,
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self::with_verbosity(Verbosity::Normal)
    }

    pub fn with_verbosity(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            spinner: None,
        }
    }

    /// Handles a progress event, printing appropriate output.
    pub fn handle_progress(&mut self, event: ProgressEvent) {
        if self.verbosity == Verbosity::Quiet {
            return;
        }

        match event {
            ProgressEvent::RunStarted { total_scenarios } => {
                self.print_run_started(total_scenarios);
            }
            ProgressEvent::ScenarioStarted {
                scenario,
                method,
                endpoint,
            } => {
                if self.verbosity == Verbosity::Verbose {
                    println!("  {} {} {}", "→".dimmed(), method, endpoint);
                }
                self.start_spinner(&format!("{method} {endpoint} [{scenario}]"));
            }
            ProgressEvent::ScenarioCompleted { result } => {
                self.clear_spinner();
                self.print_scenario_completed(&result);
            }
            ProgressEvent::ScenarioSkipped { scenario, reason } => {
                self.print_scenario_skipped(&scenario, &reason);
            }
            ProgressEvent::RunCompleted { .. } => {
                // Summary is printed separately via print_summary
                self.clear_spinner();
            }
        }
    }

    fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    fn clear_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn print_run_started(&self, total: usize) {
        println!(
            "\n{}\n",
            format!(
                "Running {} scenario{}...",
                total,
                if total == 1 { "" } else { "s" }
            )
            .bold()
        );
    }

    fn print_scenario_completed(&self, result: &ScenarioResult) {
        let mark = if result.passed() {
            "✔".green()
        } else {
            "✖".red()
        };
        let duration = format_duration(result.duration).dimmed();

        println!(
            "  {} {} {} {} {}",
            mark,
            result.method.bold(),
            result.endpoint,
            format!("[{}]", result.scenario).cyan(),
            duration
        );

        match &result.outcome {
            ScenarioOutcome::Passed => {}
            ScenarioOutcome::Failed { message, .. } => println!("      {}", message.red()),
            ScenarioOutcome::Errored { message } => println!("      {}", message.yellow()),
        }
    }

    fn print_scenario_skipped(&self, scenario: &str, reason: &str) {
        println!(
            "  {} {} {}",
            "-".dimmed(),
            scenario.dimmed(),
            format!("({reason})").dimmed()
        );
    }

    /// Prints the summary of the run. Quiet mode prints a single line.
    pub fn print_summary(&self, results: &RunResults) {
        let passed = results.passed_count();
        let failed = results.failed_count();
        let total = results.total_count();

        if self.verbosity == Verbosity::Quiet {
            if failed == 0 {
                println!("{}", format!("✔ {passed}/{total} passed").green());
            } else {
                println!("{}", format!("✖ {failed}/{total} failed").red());
            }
            return;
        }

        println!("\n{}", "━".repeat(40).dimmed());

        let mut parts = vec![];
        if passed > 0 {
            parts.push(format!("{passed} passed").green().to_string());
        }
        if failed > 0 {
            parts.push(format!("{failed} failed").red().to_string());
        }
        if !results.skipped.is_empty() {
            parts.push(
                format!("{} skipped", results.skipped.len())
                    .dimmed()
                    .to_string(),
            );
        }

        let verdict = if failed == 0 {
            "PASSED".green().bold()
        } else {
            "FAILED".red().bold()
        };
        println!("{} {}", verdict, parts.join(", "));
        println!(
            "{}",
            format!("Completed in {}", format_duration(results.duration)).dimmed()
        );
    }

    /// Prints every route and its scenarios.
    pub fn print_routes(&self, config: &Config) {
        if config.routes.is_empty() {
            println!("{}", "No routes with functional tests.".dimmed());
            return;
        }

        for route in &config.routes {
            println!("{} {}", route.method.bold(), route.template);
            for name in &route.scenarios {
                if config.scenario(name).is_some() {
                    println!("  {name}");
                } else {
                    println!("  {} {}", name.yellow(), "(not defined)".dimmed());
                }
            }
        }
    }

    /// Prints normalizer warnings and the implied paths of every scenario.
    pub fn print_check(&self, config: &Config) {
        for warning in &config.warnings {
            println!("{} {}", "warning:".yellow().bold(), warning);
        }

        for (name, implied) in &config.implied {
            println!("{}", name.bold());
            if implied.is_empty() {
                println!("  {}", "no implied paths".dimmed());
            }
            for path in implied {
                println!("  {path}");
            }
        }

        println!(
            "\n{}",
            format!(
                "{} scenarios, {} routes, {} warnings",
                config.scenarios.len(),
                config.routes.len(),
                config.warnings.len()
            )
            .green()
        );
    }
}

fn format_duration(duration: Duration) -> String {
    if duration < Duration::from_secs(1) {
        format!("({}ms)", duration.as_millis())
    } else {
        format!("({:.1}s)", duration.as_secs_f64())
    }
}

/// Creates a progress callback for use with TestRunner.
pub fn create_progress_callback(verbosity: Verbosity) -> ProgressCallback {
    let reporter = Arc::new(Mutex::new(TerminalReporter::with_verbosity(verbosity)));

    Box::new(move |event| {
        if let Ok(mut r) = reporter.lock() {
            r.handle_progress(event);
        }
    })
}

/// Full run report for serialization.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport<'a> {
    pub timestamp: DateTime<Utc>,
    pub volley_version: &'static str,
    pub duration_ms: u64,
    pub passed: bool,
    pub summary: ReportSummary,
    pub results: &'a [ScenarioResult],
    pub skipped: &'a [String],
}

/// Counts for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Generates machine-readable JSON reports.
#[derive(Debug, Default)]
pub struct JsonReporter;

impl JsonReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, results: &RunResults) -> Result<String, ReporterError> {
        let report = self.build_report(results);
        serde_json::to_string_pretty(&report).map_err(ReporterError::from)
    }

    pub fn build_report<'a>(&self, results: &'a RunResults) -> RunReport<'a> {
        RunReport {
            timestamp: Utc::now(),
            volley_version: crate::VERSION,
            duration_ms: u64::try_from(results.duration.as_millis()).unwrap_or(u64::MAX),
            passed: results.all_passed(),
            summary: ReportSummary {
                total: results.total_count(),
                passed: results.passed_count(),
                failed: results.failed_count(),
                skipped: results.skipped.len(),
            },
            results: &results.results,
            skipped: &results.skipped,
        }
    }
}
