//! Index of project-local module names discovered during a scan.

use std::collections::BTreeMap;

/// Maps dotted module names of scanned files to their root-relative paths.
///
/// Used to tell project-local imports that no layer covers apart from
/// third-party ones.
#[derive(Debug, Default, Clone)]
pub struct ModuleIndex {
    modules: BTreeMap<String, String>,
}

impl ModuleIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module name for a file.
    pub fn insert(&mut self, module: impl Into<String>, path: impl Into<String>) {
        self.modules.insert(module.into(), path.into());
    }

    /// Number of indexed modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Finds the file backing `name`.
    ///
    /// Matches the module itself, an enclosing module when `name` refers to a
    /// symbol inside it (`pkg.mod.Class`), or the first module inside the
    /// package `name` (`pkg` for `pkg/mod.py`).
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&str> {
        let mut candidate = name;
        loop {
            if let Some(path) = self.modules.get(candidate) {
                return Some(path);
            }
            match candidate.rfind('.') {
                Some(idx) => candidate = &candidate[..idx],
                None => break,
            }
        }

        let package = format!("{name}.");
        self.modules
            .range(package.clone()..)
            .next()
            .filter(|(module, _)| module.starts_with(&package))
            .map(|(_, path)| path.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> ModuleIndex {
        let mut index = ModuleIndex::new();
        index.insert("scripts.seed", "scripts/seed.py");
        index.insert("tools", "tools/__init__.py");
        index
    }

    #[test]
    fn finds_exact_module() {
        assert_eq!(index().lookup("scripts.seed"), Some("scripts/seed.py"));
    }

    #[test]
    fn finds_enclosing_module_for_symbol() {
        assert_eq!(index().lookup("scripts.seed.run"), Some("scripts/seed.py"));
        assert_eq!(index().lookup("tools.cli.main"), Some("tools/__init__.py"));
    }

    #[test]
    fn finds_namespace_package() {
        assert_eq!(index().lookup("scripts"), Some("scripts/seed.py"));
    }

    #[test]
    fn does_not_match_sibling_prefix() {
        assert_eq!(index().lookup("script"), None);
        assert_eq!(index().lookup("scriptsx"), None);
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(index().lookup("requests"), None);
        assert!(!index().is_empty());
        assert_eq!(index().len(), 2);
    }
}
