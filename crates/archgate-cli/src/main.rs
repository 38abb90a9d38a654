//! archgate CLI.
//!
//! Usage:
//! ```bash
//! archgate [--root DIR] [--ignore-tests] [--ignored-packages NAME...] [--log-level LEVEL]
//! archgate layers
//! archgate init [--hierarchical]
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use archgate_core::ConfigError;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Enforce layered architecture dependencies in a Python source tree
#[derive(Parser)]
#[command(name = "archgate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root directory to scan [default: current directory]
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Diagnostic verbosity on stderr
    #[arg(long, global = true, value_enum, ignore_case = true, default_value = "info")]
    log_level: LogLevel,

    #[command(flatten)]
    check: CheckArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options for the default check run.
#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Skip test files (test_*.py, *_test.py, conftest.py)
    #[arg(long)]
    pub ignore_tests: bool,

    /// Package name substrings to leave out of scanning and import checks.
    /// Takes every following word up to the next flag.
    #[arg(long, num_args = 1.., value_name = "NAME", value_parser = package_name)]
    pub ignored_packages: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Worker threads [default: one per CPU core]
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Abort the scan after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective layer map and dependency policy
    Layers,

    /// Write an archgate.toml template
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,

        /// Use weighted layers instead of an allow-list
        #[arg(long)]
        hierarchical: bool,
    },
}

/// Output format for scan results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Summary plus a numbered violation list.
    #[default]
    Text,
    /// One line per violation.
    Compact,
    /// The whole report as JSON.
    Json,
}

/// `--log-level` values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    #[value(alias = "warn")]
    Warning,
    Error,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error => "error",
        }
    }
}

/// `--ignored-packages` swallows trailing words, so a subcommand name there
/// is a misplaced subcommand rather than a package.
fn package_name(value: &str) -> Result<String, String> {
    use clap::CommandFactory;
    if Cli::command().find_subcommand(value).is_some() {
        return Err(format!(
            "'{value}' is a subcommand; run it without --ignored-packages"
        ));
    }
    Ok(value.to_owned())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(cli.log_level.directive()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = cli.root.as_deref();
    let config = cli.config.as_deref();
    let result = match cli.command {
        None => commands::check::run(root, config, &cli.check),
        Some(Commands::Layers) => commands::layers::run(root, config).map(|()| ExitCode::SUCCESS),
        Some(Commands::Init {
            force,
            hierarchical,
        }) => commands::init::run(root, force, hierarchical).map(|()| ExitCode::SUCCESS),
    };

    result.unwrap_or_else(|err| {
        match err.downcast::<ConfigError>() {
            Ok(config_err) => eprintln!("{:?}", miette::Report::new(config_err)),
            Err(err) => eprintln!("Error: {err:#}"),
        }
        ExitCode::FAILURE
    })
}
