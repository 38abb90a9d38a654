//! Language-agnostic extraction trait.
//!
//! `LanguageExtractor` is the extension point for adding new languages.
//! Implement it to teach archgate how to pull import edges out of a source
//! file and how that language names its modules.

use crate::types::ImportEdge;

/// Why a file contributed no import edges.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// The text is not valid syntax.
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        /// Line (1-indexed) of the first error.
        line: usize,
        /// Column (1-indexed) of the first error.
        column: usize,
        /// What the parser found there.
        message: String,
    },
    /// The parser could not be configured for the language.
    #[error("parser setup failed: {0}")]
    Language(String),
    /// The parser gave up without producing a tree.
    #[error("parser produced no syntax tree")]
    Aborted,
}

impl ExtractError {
    /// Line the error points at, if any.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Syntax { line, .. } => Some(*line),
            Self::Language(_) | Self::Aborted => None,
        }
    }
}

/// Trait for language-specific import extraction.
///
/// Implementations are shared across worker threads.
pub trait LanguageExtractor: Send + Sync {
    /// Language identifier (e.g., `"python"`).
    fn language_id(&self) -> &'static str;

    /// File extensions this extractor handles (e.g., `&[".py", ".pyi"]`).
    fn extensions(&self) -> &'static [&'static str];

    /// Extract every import edge from source text, ordered by line.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the text cannot be parsed.
    fn extract_imports(&self, source: &str) -> Result<Vec<ImportEdge>, ExtractError>;

    /// Dotted module name for a root-relative, `/`-separated file path.
    fn module_name(&self, path: &str) -> Option<String>;

    /// Turn a possibly relative import target into an absolute module name.
    ///
    /// `importer` is the root-relative path of the importing file. Returns
    /// `None` when the target cannot be anchored inside the project.
    fn resolve_relative(&self, importer: &str, target: &str) -> Option<String> {
        let _ = importer;
        Some(target.to_owned())
    }

    /// Whether a file name follows the language's test-file convention.
    fn is_test_file(&self, file_name: &str) -> bool {
        let _ = file_name;
        false
    }
}
