//! Default command: scan the tree and gate on violations.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use archgate_core::{ArchConfig, LanguageExtractor, ScanReport, ScanStatus, Scanner};
use archgate_python::PythonExtractor;

use crate::config_resolver;
use crate::CheckArgs;

use super::output;

/// Runs the check and maps the outcome to the process exit code.
pub fn run(root: Option<&Path>, explicit: Option<&Path>, args: &CheckArgs) -> Result<ExitCode> {
    let report = scan(root, explicit, args)?;

    output::log_diagnostics(&report);
    output::print(&report, args.format)?;

    Ok(ExitCode::from(exit_status(report.status())))
}

/// Resolves configuration, applies CLI overrides and runs one scan.
pub fn scan(root: Option<&Path>, explicit: Option<&Path>, args: &CheckArgs) -> Result<ScanReport> {
    let source = config_resolver::resolve(root.unwrap_or(Path::new(".")), explicit);
    tracing::info!("Using configuration from {source}");

    let mut config = source.load()?;
    apply_overrides(&mut config, root, args);

    let extractors: Vec<Box<dyn LanguageExtractor>> = vec![Box::new(PythonExtractor::new())];
    let report = Scanner::new(&config, extractors)?.run()?;
    Ok(report)
}

/// CLI flags take precedence over `[analyzer]` values.
fn apply_overrides(config: &mut ArchConfig, root: Option<&Path>, args: &CheckArgs) {
    let analyzer = &mut config.analyzer;
    if let Some(root) = root {
        analyzer.root = root.to_path_buf();
    }
    analyzer.ignore_tests |= args.ignore_tests;
    for pkg in &args.ignored_packages {
        if !analyzer.ignored_packages.contains(pkg) {
            analyzer.ignored_packages.push(pkg.clone());
        }
    }
    if args.jobs.is_some() {
        analyzer.jobs = args.jobs;
    }
    if args.timeout.is_some() {
        analyzer.timeout_secs = args.timeout;
    }
}

/// 0 = pass, 1 = violations, 2 = timed out.
fn exit_status(status: ScanStatus) -> u8 {
    match status {
        ScanStatus::Passed => 0,
        ScanStatus::Failed => 1,
        ScanStatus::TimedOut => 2,
    }
}
