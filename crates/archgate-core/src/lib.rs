//! # archgate-core
//!
//! Language-agnostic core of the archgate layer checker.
//!
//! - [`LayerResolver`] maps file paths and import names to layers
//! - [`RuleEngine`] decides whether a layer may depend on another
//! - [`LanguageExtractor`] is implemented per language to pull import edges
//! - [`Scanner`] walks a project, fans files out to workers and builds a
//!   [`ScanReport`]
//!
//! ## Example
//!
//! ```ignore
//! use archgate_core::{ArchConfig, Scanner};
//!
//! let config = ArchConfig::from_file("archgate.toml".as_ref())?;
//! let report = Scanner::new(&config, vec![Box::new(PythonExtractor::new())])?.run()?;
//! for v in &report.violations {
//!     println!("{v}");
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod extractor;
mod layer;
mod modules;
mod scanner;
mod types;

/// Walk filters shared by the scanner and language crates.
pub mod filters;

pub use config::{normalize_prefix, AnalyzerConfig, ArchConfig, ConfigError, LayerDef, PolicyMode};
pub use engine::{EdgeVerdict, RuleEngine};
pub use extractor::{ExtractError, LanguageExtractor};
pub use layer::LayerResolver;
pub use modules::ModuleIndex;
pub use scanner::{ScanError, ScanPhase, Scanner};
pub use types::{
    Classification, Diagnostic, DiagnosticKind, ImportEdge, Layer, ScanReport, ScanStatus,
    Severity, SourceModule, Violation,
};
