//! Core types for layers, import edges, violations and scan results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message.
    Info,
    /// Something the user should look at, typically a configuration gap.
    Warning,
    /// A file could not be analyzed.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A named architectural tier (e.g. `domain`, `application`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Layer(String);

impl Layer {
    /// Creates a layer from its name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The layer name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Layer {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Outcome of classifying a file path or an import target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Belongs to a declared layer.
    Layer(Layer),
    /// Project-local, but no layer prefix covers it.
    Unknown,
    /// Third-party or standard library; never subject to layer rules.
    External,
}

impl Classification {
    /// Returns the layer, if the classification resolved to one.
    #[must_use]
    pub fn layer(&self) -> Option<&Layer> {
        match self {
            Self::Layer(layer) => Some(layer),
            Self::Unknown | Self::External => None,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layer(layer) => write!(f, "{layer}"),
            Self::Unknown => write!(f, "<unknown>"),
            Self::External => write!(f, "<external>"),
        }
    }
}

/// A single import statement target found in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEdge {
    /// Module or package path as written (relative imports keep their dots).
    pub target_name: String,
    /// Line number (1-indexed) of the statement.
    pub line: usize,
}

impl ImportEdge {
    /// Creates a new edge.
    #[must_use]
    pub fn new(target_name: impl Into<String>, line: usize) -> Self {
        Self {
            target_name: target_name.into(),
            line,
        }
    }
}

/// A discovered source file, classified and with its imports extracted.
#[derive(Debug, Clone)]
pub struct SourceModule {
    /// Path relative to the scan root, `/`-separated.
    pub path: String,
    /// Layer of the file (never `External`).
    pub layer: Classification,
    /// Imports declared by the file, in line order.
    pub imports: Vec<ImportEdge>,
}

/// A forbidden dependency edge.
///
/// Field order defines the report ordering: path, then line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Violation {
    /// Importing file, relative to the scan root.
    pub source_path: String,
    /// Line (1-indexed) of the offending import.
    pub line: usize,
    /// Layer of the importing file.
    pub source_layer: Layer,
    /// Layer of the imported module.
    pub target_layer: Layer,
    /// Imported module name.
    pub target_name: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} -> {} ({})",
            self.source_path, self.line, self.source_layer, self.target_layer, self.target_name
        )
    }
}

/// Category of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// The file is not valid syntax for its language.
    ParseError,
    /// The file or directory could not be read.
    IoError,
    /// The file lies outside every declared layer.
    UnknownLayer,
    /// An import resolved to a project-local module with no layer.
    UnresolvedTarget,
    /// The scan hit its deadline before all files were checked.
    TimedOut,
}

impl DiagnosticKind {
    /// Default severity for this kind.
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::ParseError | Self::IoError | Self::TimedOut => Severity::Error,
            Self::UnknownLayer | Self::UnresolvedTarget => Severity::Warning,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ParseError => "parse-error",
            Self::IoError => "io-error",
            Self::UnknownLayer => "unknown-layer",
            Self::UnresolvedTarget => "unresolved-target",
            Self::TimedOut => "timed-out",
        };
        f.write_str(s)
    }
}

/// A non-fatal observation that is not a violation.
///
/// Field order defines the report ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    /// File the diagnostic refers to, relative to the scan root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Line (1-indexed), when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Category.
    pub kind: DiagnosticKind,
    /// Human-readable message.
    pub message: String,
    /// Severity, derived from the kind.
    pub severity: Severity,
}

impl Diagnostic {
    /// Creates a diagnostic not tied to any file.
    #[must_use]
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            path: None,
            line: None,
            kind,
            message: message.into(),
            severity: kind.severity(),
        }
    }

    /// Creates a diagnostic for a file.
    #[must_use]
    pub fn for_file(kind: DiagnosticKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::new(kind, message)
        }
    }

    /// Attaches a line number.
    #[must_use]
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, self.line) {
            (Some(path), Some(line)) => write!(f, "{path}:{line}: ")?,
            (Some(path), None) => write!(f, "{path}: ")?,
            _ => {}
        }
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Overall verdict of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// No violations.
    Passed,
    /// One or more violations.
    Failed,
    /// The deadline expired before the scan finished.
    TimedOut,
}

/// Aggregated result of one scan.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Number of source files read and classified.
    pub files_processed: usize,
    /// Violations sorted by path, then line.
    pub violations: Vec<Violation>,
    /// Diagnostics sorted by path, then line.
    pub diagnostics: Vec<Diagnostic>,
    /// Whether the scan was aborted by its timeout.
    pub timed_out: bool,
}

impl ScanReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if any violation was found.
    #[must_use]
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Verdict of the run. Diagnostics never influence it.
    #[must_use]
    pub fn status(&self) -> ScanStatus {
        if self.timed_out {
            ScanStatus::TimedOut
        } else if self.has_violations() {
            ScanStatus::Failed
        } else {
            ScanStatus::Passed
        }
    }

    /// Counts diagnostics of the given kind.
    #[must_use]
    pub fn count_diagnostics(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }

    /// Sorts violations and diagnostics into their canonical order.
    pub fn sort(&mut self) {
        self.violations.sort();
        self.diagnostics.sort();
    }
}
