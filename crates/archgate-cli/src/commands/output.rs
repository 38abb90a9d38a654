//! Report rendering and diagnostic logging.

use std::fmt::Write as _;

use anyhow::Result;
use archgate_core::{ScanReport, Severity};

use crate::OutputFormat;

/// Print the report to stdout in the requested format.
pub fn print(report: &ScanReport, format: OutputFormat) -> Result<()> {
    let rendered = render(report, format)?;
    if !rendered.is_empty() {
        println!("{rendered}");
    }
    Ok(())
}

/// Render the report without a trailing newline.
pub fn render(report: &ScanReport, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => render_text(report),
        OutputFormat::Compact => render_compact(report),
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
    })
}

fn render_text(report: &ScanReport) -> String {
    let mut out = format!("Processed {} file(s)\n", report.files_processed);

    if report.violations.is_empty() {
        out.push_str("No architecture violations found.");
    } else {
        let _ = write!(
            out,
            "Found {} architecture violation(s):",
            report.violations.len()
        );
        for (i, v) in report.violations.iter().enumerate() {
            let _ = write!(
                out,
                "\n  {}. {}:{}  {} -> {} ({})",
                i + 1,
                v.source_path,
                v.line,
                v.source_layer,
                v.target_layer,
                v.target_name
            );
        }
    }

    if report.timed_out {
        out.push_str("\nScan timed out; results are incomplete.");
    }
    out
}

fn render_compact(report: &ScanReport) -> String {
    report
        .violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Emit every diagnostic on the log stream, then a one-line count.
pub fn log_diagnostics(report: &ScanReport) {
    for d in &report.diagnostics {
        match d.severity {
            Severity::Error => tracing::error!("{d}"),
            Severity::Warning => tracing::warn!("{d}"),
            Severity::Info => tracing::info!("{d}"),
        }
    }
    tracing::info!("{} diagnostic(s)", report.diagnostics.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use archgate_core::{Diagnostic, DiagnosticKind, Layer, Violation};

    fn violation(path: &str, line: usize, target: &str, name: &str) -> Violation {
        Violation {
            source_path: path.into(),
            line,
            source_layer: Layer::new("domain"),
            target_layer: Layer::new(target),
            target_name: name.into(),
        }
    }

    fn failing_report() -> ScanReport {
        ScanReport {
            files_processed: 4,
            violations: vec![
                violation("domain/service/x.py", 3, "application", "application.service.y"),
                violation("domain/user.py", 1, "adapter", "..adapter.db"),
            ],
            diagnostics: vec![Diagnostic::for_file(
                DiagnosticKind::ParseError,
                "domain/broken.py",
                "syntax error at line 2, column 5: invalid syntax",
            )
            .at_line(2)],
            timed_out: false,
        }
    }

    #[test]
    fn text_pass() {
        let report = ScanReport {
            files_processed: 0,
            ..ScanReport::default()
        };
        insta::assert_snapshot!(render(&report, OutputFormat::Text).unwrap(), @r"
        Processed 0 file(s)
        No architecture violations found.
        ");
    }

    #[test]
    fn text_violations() {
        insta::assert_snapshot!(render(&failing_report(), OutputFormat::Text).unwrap(), @r"
        Processed 4 file(s)
        Found 2 architecture violation(s):
          1. domain/service/x.py:3  domain -> application (application.service.y)
          2. domain/user.py:1  domain -> adapter (..adapter.db)
        ");
    }

    #[test]
    fn text_timed_out() {
        let report = ScanReport {
            files_processed: 1,
            timed_out: true,
            ..ScanReport::default()
        };
        insta::assert_snapshot!(render(&report, OutputFormat::Text).unwrap(), @r"
        Processed 1 file(s)
        No architecture violations found.
        Scan timed out; results are incomplete.
        ");
    }

    #[test]
    fn compact_is_one_line_per_violation() {
        insta::assert_snapshot!(render(&failing_report(), OutputFormat::Compact).unwrap(), @r"
        domain/service/x.py:3: domain -> application (application.service.y)
        domain/user.py:1: domain -> adapter (..adapter.db)
        ");
    }

    #[test]
    fn compact_pass_is_empty() {
        let rendered = render(&ScanReport::default(), OutputFormat::Compact).unwrap();
        assert!(rendered.is_empty());
    }

    #[test]
    fn json_carries_whole_report() {
        let rendered = render(&failing_report(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["files_processed"], 4);
        assert_eq!(value["timed_out"], false);
        assert_eq!(value["violations"][0]["source_layer"], "domain");
        assert_eq!(value["violations"][1]["target_name"], "..adapter.db");
        assert_eq!(value["diagnostics"][0]["kind"], "parse-error");
        assert_eq!(value["diagnostics"][0]["severity"], "error");
        assert_eq!(value["diagnostics"][0]["line"], 2);
    }
}
