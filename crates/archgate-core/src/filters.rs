//! Pass-through filters applied before classification.

/// Directory and file names never scanned, besides hidden entries.
pub const EXCLUDED_NAMES: &[&str] = &[
    "__pycache__",
    "venv",
    "node_modules",
    "vendor",
    "build",
    "dist",
    "site-packages",
];

/// Is this walk entry name excluded (VCS metadata, caches, build output)?
///
/// Hidden entries (`.git`, `.venv`, `.mypy_cache`, ...) are always excluded.
#[must_use]
pub fn is_excluded_name(name: &str) -> bool {
    name.starts_with('.') || name.ends_with(".egg-info") || EXCLUDED_NAMES.contains(&name)
}

/// Does `haystack` contain any of the ignored package substrings?
#[must_use]
pub fn matches_ignored(haystack: &str, ignored: &[String]) -> bool {
    ignored
        .iter()
        .any(|pkg| !pkg.is_empty() && haystack.contains(pkg.as_str()))
}
