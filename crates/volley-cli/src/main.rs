//! # volley
//!
//! Declarative functional API tests.
//!
//! ## Usage
//!
//! ```bash
//! # Run every scenario referenced by the OpenAPI document
//! volley run volley.yml --openapi openapi.yml
//!
//! # Only scenarios whose name, path or method matches
//! volley run volley.yml -o openapi.yml --filter users
//!
//! # Machine-readable results for CI
//! volley run volley.yml -o https://api.example.com/openapi.yml --format json
//!
//! # Inspect routes, or validate the documents without sending anything
//! volley list volley.yml -o openapi.yml
//! volley check volley.yml -o openapi.yml
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::{IsTerminal, stdout};
use tracing::debug;
use volley_cli::{
    ConfigSource, JsonReporter, ReqwestClient, RunConfig, TerminalReporter, TestRunner, Verbosity,
    create_progress_callback, load_config,
};
use volley_core::Config;

/// Color output mode for terminal display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum ColorMode {
    /// Automatically detect if stdout is a TTY
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl ColorMode {
    fn should_use_colors(self) -> bool {
        match self {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => stdout().is_terminal(),
        }
    }
}

/// Output format for run results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum OutputFormat {
    /// Colored progress and summary
    #[default]
    Human,
    /// JSON report on stdout
    Json,
}

/// Volley - declarative functional API testing
#[derive(Parser, Debug)]
#[command(name = "volley", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Color output mode (auto, always, never)
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    color: ColorMode,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send every scenario and check the responses
    Run(RunArgs),

    /// List routes and the scenarios bound to them
    List(SourceArgs),

    /// Load and normalize the documents without sending requests
    Check(SourceArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Main configuration document (path or http(s) URL)
    config: ConfigSource,

    /// OpenAPI document with `v-functional-test` annotations (path or URL)
    #[arg(short = 'o', long)]
    openapi: Option<ConfigSource>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Only run scenarios whose name, path or method matches
    #[arg(long)]
    filter: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Only print the final summary
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output on stdout stays parseable
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    colored::control::set_override(cli.color.should_use_colors());

    match cli.command {
        Commands::Run(args) => run_command(args, cli.verbose).await,
        Commands::List(args) => {
            let config = load(&args).await?;
            TerminalReporter::new().print_routes(&config);
            Ok(())
        }
        Commands::Check(args) => {
            let config = load(&args).await?;
            TerminalReporter::new().print_check(&config);
            Ok(())
        }
    }
}

async fn load(args: &SourceArgs) -> Result<Config> {
    let label = args.config.label();
    debug!("Loading {}", label);
    load_config(&args.config, args.openapi.as_ref())
        .await
        .with_context(|| match &args.openapi {
            Some(openapi) => format!("Failed to load {} with {}", label, openapi.label()),
            None => format!("Failed to load {label}"),
        })
}

async fn run_command(args: RunArgs, verbose: bool) -> Result<()> {
    let config = load(&args.source).await?;

    let verbosity = if args.quiet {
        Verbosity::Quiet
    } else if verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };

    let client = ReqwestClient::new().context("Failed to create HTTP client")?;
    let mut runner = TestRunner::new(config, Box::new(client));
    if args.format == OutputFormat::Human {
        runner = runner.on_progress(create_progress_callback(verbosity));
    }

    let mut run_config = RunConfig::new();
    if let Some(filter) = args.filter {
        run_config = run_config.with_filter(filter);
    }

    let results = runner.run(&run_config).await?;

    match args.format {
        OutputFormat::Human => TerminalReporter::with_verbosity(verbosity).print_summary(&results),
        OutputFormat::Json => println!("{}", JsonReporter::new().generate(&results)?),
    }

    if !results.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}
