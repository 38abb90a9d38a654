//! Scanner: walks the project tree, checks files on a worker pool and
//! aggregates violations and diagnostics into a [`ScanReport`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::{ArchConfig, ConfigError};
use crate::engine::{EdgeVerdict, RuleEngine};
use crate::extractor::LanguageExtractor;
use crate::filters;
use crate::layer::LayerResolver;
use crate::modules::ModuleIndex;
use crate::types::{
    Classification, Diagnostic, DiagnosticKind, ScanReport, SourceModule, Violation,
};

/// Errors that abort a scan after configuration succeeded.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The worker pool could not be started.
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    /// The thread feeding the worker pool could not be spawned.
    #[error("failed to start scan thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Lifecycle of a single scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    /// Constructed, not yet started.
    Idle,
    /// Walking the tree and checking files.
    Scanning,
    /// Merging and sorting worker results.
    Aggregating,
    /// Report produced.
    Done,
}

impl ScanPhase {
    /// The phase that follows this one. `Done` is terminal.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Idle => Self::Scanning,
            Self::Scanning => Self::Aggregating,
            Self::Aggregating | Self::Done => Self::Done,
        }
    }
}

/// A file selected for checking.
#[derive(Debug)]
struct SourceFile {
    abs: PathBuf,
    rel: String,
    extractor: usize,
}

/// Result of checking one file, sent from a worker to the aggregator.
#[derive(Debug, Default)]
struct FileOutcome {
    processed: bool,
    violations: Vec<Violation>,
    diagnostics: Vec<Diagnostic>,
}

/// Single-pass architecture scanner.
///
/// Consumed by [`Scanner::run`]; build a new one for every scan.
pub struct Scanner<'a> {
    config: &'a ArchConfig,
    extractors: Arc<[Box<dyn LanguageExtractor>]>,
    resolver: LayerResolver,
    engine: RuleEngine,
    phase: ScanPhase,
}

impl<'a> Scanner<'a> {
    /// Validates `config` and prepares a scanner.
    ///
    /// # Errors
    ///
    /// Returns the first configuration problem found.
    pub fn new(
        config: &'a ArchConfig,
        extractors: Vec<Box<dyn LanguageExtractor>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if extractors.is_empty() {
            return Err(ConfigError::Validation("no language extractors registered".into()));
        }
        Ok(Self {
            config,
            extractors: Arc::from(extractors),
            resolver: LayerResolver::new(config),
            engine: RuleEngine::new(config),
            phase: ScanPhase::Idle,
        })
    }

    fn advance(&mut self) {
        let next = self.phase.next();
        debug!("scan phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    /// Runs the scan to completion (or until the configured timeout).
    ///
    /// On timeout this returns at the deadline. Files already being checked
    /// finish on the detached pool and their results are discarded.
    ///
    /// # Errors
    ///
    /// Returns an error only if the worker pool cannot be created. Per-file
    /// problems end up in [`ScanReport::diagnostics`].
    pub fn run(mut self) -> Result<ScanReport, ScanError> {
        let started = Instant::now();
        let deadline = self.config.analyzer.timeout().map(|t| started + t);

        self.advance();
        info!("Scanning {}", self.config.analyzer.root.display());

        let mut report = ScanReport::new();
        let files = self.discover(&mut report.diagnostics);
        let index = self.build_index(&files);
        let total = files.len();
        debug!("Discovered {total} source files, {} modules", index.len());

        let (outcomes, timed_out) = self.check_all(files, index, deadline)?;

        self.advance();
        let checked = outcomes.len();
        for outcome in outcomes {
            if outcome.processed {
                report.files_processed += 1;
            }
            report.violations.extend(outcome.violations);
            report.diagnostics.extend(outcome.diagnostics);
        }
        if timed_out {
            report.timed_out = true;
            report.diagnostics.push(Diagnostic::new(
                DiagnosticKind::TimedOut,
                format!("scan exceeded its timeout after checking {checked} of {total} files"),
            ));
        }
        report.sort();
        self.advance();

        info!(
            "Scan complete: {} violation(s), {} diagnostic(s) in {} file(s) ({:.2?})",
            report.violations.len(),
            report.diagnostics.len(),
            report.files_processed,
            started.elapsed()
        );
        Ok(report)
    }

    /// Walks the root and selects the files to check.
    fn discover(&self, diagnostics: &mut Vec<Diagnostic>) -> Vec<SourceFile> {
        let analyzer = &self.config.analyzer;
        let root = analyzer.root.as_path();

        let mut builder = ignore::WalkBuilder::new(root);
        builder
            .standard_filters(false)
            .follow_links(true)
            .filter_entry(|entry| {
                entry.depth() == 0 || !filters::is_excluded_name(&entry.file_name().to_string_lossy())
            });

        let mut files = Vec::new();
        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    debug!("walk error: {err}");
                    diagnostics.push(walk_diagnostic(root, &err));
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let Some(extractor) = self.extractor_for(entry.path()) else {
                continue;
            };

            let rel = relative_path(root, entry.path());
            let file_name = entry.file_name().to_string_lossy();

            if analyzer.ignore_tests && self.extractors[extractor].is_test_file(&file_name) {
                debug!("Skipping test file {rel}");
                continue;
            }
            if filters::matches_ignored(&rel, &analyzer.ignored_packages) {
                debug!("Skipping ignored package file {rel}");
                continue;
            }

            files.push(SourceFile {
                abs: entry.into_path(),
                rel,
                extractor,
            });
        }

        files.sort_by(|a, b| a.rel.cmp(&b.rel));
        files
    }

    fn extractor_for(&self, path: &Path) -> Option<usize> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))?;
        self.extractors
            .iter()
            .position(|e| e.extensions().contains(&ext.as_str()))
    }

    fn build_index(&self, files: &[SourceFile]) -> ModuleIndex {
        let mut index = ModuleIndex::new();
        for file in files {
            if let Some(module) = self.extractors[file.extractor].module_name(&file.rel) {
                index.insert(module, file.rel.as_str());
            }
        }
        index
    }

    /// Fans files out to the worker pool and drains results on this thread.
    ///
    /// The pool runs on its own dispatch thread, which is joined only when
    /// every file was checked. Returns the collected outcomes and whether the
    /// deadline expired.
    fn check_all(
        &self,
        files: Vec<SourceFile>,
        index: ModuleIndex,
        deadline: Option<Instant>,
    ) -> Result<(Vec<FileOutcome>, bool), ScanError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.analyzer.jobs.unwrap_or(0))
            .thread_name(|i| format!("archgate-worker-{i}"))
            .build()?;

        let checker = FileChecker {
            extractors: Arc::clone(&self.extractors),
            resolver: self.resolver.clone(),
            engine: self.engine.clone(),
            ignored_packages: self.config.analyzer.ignored_packages.clone(),
            index,
        };
        let cancelled = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel::<FileOutcome>();
        let mut outcomes = Vec::with_capacity(files.len());
        let mut timed_out = false;

        let dispatch = {
            let cancelled = Arc::clone(&cancelled);
            std::thread::Builder::new()
                .name("archgate-dispatch".into())
                .spawn(move || {
                    pool.install(|| {
                        files.par_iter().for_each_with(tx, |tx, file| {
                            if cancelled.load(Ordering::Relaxed) {
                                return;
                            }
                            // The aggregator stops listening once the deadline passes.
                            let _ = tx.send(checker.check_file(file));
                        });
                    });
                })?
        };

        loop {
            let received = match deadline {
                None => rx.recv().ok(),
                Some(deadline) => {
                    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                        Ok(outcome) => Some(outcome),
                        Err(RecvTimeoutError::Timeout) => {
                            cancelled.store(true, Ordering::Relaxed);
                            timed_out = true;
                            None
                        }
                        Err(RecvTimeoutError::Disconnected) => None,
                    }
                }
            };
            match received {
                Some(outcome) => outcomes.push(outcome),
                None => break,
            }
        }

        if timed_out {
            debug!("deadline passed, detaching worker pool");
        } else if let Err(panic) = dispatch.join() {
            std::panic::resume_unwind(panic);
        }

        Ok((outcomes, timed_out))
    }
}

/// Owned per-file checking state, moved onto the dispatch thread.
struct FileChecker {
    extractors: Arc<[Box<dyn LanguageExtractor>]>,
    resolver: LayerResolver,
    engine: RuleEngine,
    ignored_packages: Vec<String>,
    index: ModuleIndex,
}

impl FileChecker {
    /// Classify, extract and rule-check one file.
    fn check_file(&self, file: &SourceFile) -> FileOutcome {
        let mut outcome = FileOutcome::default();

        let layer = self.resolver.classify_path(&file.rel);
        if layer == Classification::Unknown {
            debug!("{}: no layer, imports not checked", file.rel);
            outcome.processed = true;
            outcome.diagnostics.push(Diagnostic::for_file(
                DiagnosticKind::UnknownLayer,
                &file.rel,
                "file is not under any declared layer",
            ));
            return outcome;
        }

        // Invalid UTF-8 is replaced, not rejected: import statements are ASCII.
        let source = match std::fs::read(&file.abs) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => {
                outcome.diagnostics.push(Diagnostic::for_file(
                    DiagnosticKind::IoError,
                    &file.rel,
                    format!("failed to read: {err}"),
                ));
                return outcome;
            }
        };
        outcome.processed = true;

        let extractor = self.extractors[file.extractor].as_ref();
        let imports = match extractor.extract_imports(&source) {
            Ok(imports) => imports,
            Err(err) => {
                let mut diagnostic =
                    Diagnostic::for_file(DiagnosticKind::ParseError, &file.rel, err.to_string());
                if let Some(line) = err.line() {
                    diagnostic = diagnostic.at_line(line);
                }
                outcome.diagnostics.push(diagnostic);
                return outcome;
            }
        };

        let module = SourceModule {
            path: file.rel.clone(),
            layer,
            imports,
        };
        debug!(
            "{}: layer {}, {} import(s)",
            module.path,
            module.layer,
            module.imports.len()
        );
        self.check_module(&module, extractor, &mut outcome);
        outcome
    }

    fn check_module(
        &self,
        module: &SourceModule,
        extractor: &dyn LanguageExtractor,
        outcome: &mut FileOutcome,
    ) {
        let ignored = &self.ignored_packages;

        for edge in &module.imports {
            if filters::matches_ignored(&edge.target_name, ignored) {
                debug!("{}:{}: {} ignored", module.path, edge.line, edge.target_name);
                continue;
            }

            let target = match extractor.resolve_relative(&module.path, &edge.target_name) {
                Some(name) if filters::matches_ignored(&name, ignored) => continue,
                Some(name) => self.resolver.classify_import(&name, &self.index),
                None => Classification::Unknown,
            };

            match self.engine.evaluate(&module.layer, &target) {
                EdgeVerdict::Allowed => {
                    debug!(
                        "{}:{}: {} -> {} ({}) allowed",
                        module.path, edge.line, module.layer, target, edge.target_name
                    );
                }
                EdgeVerdict::Exempt => {
                    debug!(
                        "{}:{}: {} is external, skipped",
                        module.path, edge.line, edge.target_name
                    );
                }
                EdgeVerdict::Unresolved => {
                    outcome.diagnostics.push(
                        Diagnostic::for_file(
                            DiagnosticKind::UnresolvedTarget,
                            &module.path,
                            format!("cannot determine the layer of '{}'", edge.target_name),
                        )
                        .at_line(edge.line),
                    );
                }
                EdgeVerdict::Denied => {
                    if let (Some(source_layer), Some(target_layer)) =
                        (module.layer.layer(), target.layer())
                    {
                        outcome.violations.push(Violation {
                            source_path: module.path.clone(),
                            line: edge.line,
                            source_layer: source_layer.clone(),
                            target_layer: target_layer.clone(),
                            target_name: edge.target_name.clone(),
                        });
                    }
                }
            }
        }
    }
}

/// Turns a walk failure into an `io-error` diagnostic on the entry it hit.
fn walk_diagnostic(root: &Path, err: &ignore::Error) -> Diagnostic {
    match split_walk_error(err) {
        (Some(path), cause) => Diagnostic::for_file(
            DiagnosticKind::IoError,
            relative_path(root, path),
            format!("failed to read: {}", walk_cause(cause)),
        ),
        (None, cause) => Diagnostic::new(DiagnosticKind::IoError, walk_cause(cause)),
    }
}

fn walk_cause(err: &ignore::Error) -> String {
    if let ignore::Error::Io(io) = err {
        // walkdir wraps the OS error together with the absolute path.
        if let Some(os) = io.get_ref().and_then(|inner| inner.source()) {
            return os.to_string();
        }
    }
    err.to_string()
}

/// Outermost path attached to a walk error, and the error beneath it.
fn split_walk_error(err: &ignore::Error) -> (Option<&Path>, &ignore::Error) {
    match err {
        ignore::Error::WithPath { path, err } => (Some(path.as_path()), split_walk_error(err).1),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            split_walk_error(err)
        }
        ignore::Error::Loop { child, .. } => (Some(child.as_path()), err),
        _ => (None, err),
    }
}

/// Root-relative, `/`-separated form of `path`.
fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
