//! Python language extractor using Tree-sitter.

use tree_sitter::{Language, Node, Parser};

use archgate_core::{ExtractError, ImportEdge, LanguageExtractor};

/// Extracts import edges from Python source and maps files to module names.
pub struct PythonExtractor {
    language: Language,
}

impl PythonExtractor {
    /// Creates a new Python extractor.
    #[must_use]
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
        }
    }

    fn text<'a>(node: &Node<'_>, src: &'a [u8]) -> &'a str {
        std::str::from_utf8(&src[node.start_byte()..node.end_byte()]).unwrap_or("")
    }

    /// Join identifier children of a `dotted_name` node with dots.
    fn dotted_name(node: &Node<'_>, src: &[u8]) -> String {
        let mut parts = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "identifier" {
                parts.push(Self::text(&child, src));
            }
        }
        parts.join(".")
    }

    /// Name of an imported item, looking through `as` aliases.
    fn imported_name(node: &Node<'_>, src: &[u8]) -> Option<String> {
        match node.kind() {
            "dotted_name" => Some(Self::dotted_name(node, src)),
            "aliased_import" => node
                .child_by_field_name("name")
                .map(|n| Self::dotted_name(&n, src)),
            _ => None,
        }
    }

    /// `import a.b, c as d`
    fn extract_import(node: &Node<'_>, src: &[u8], edges: &mut Vec<ImportEdge>) {
        let line = node.start_position().row + 1;
        let mut cursor = node.walk();
        for name in node.children_by_field_name("name", &mut cursor) {
            if let Some(target) = Self::imported_name(&name, src) {
                edges.push(ImportEdge::new(target, line));
            }
        }
    }

    /// `from a.b import c`, `from ..a import b`, `from . import c, d`
    fn extract_import_from(node: &Node<'_>, src: &[u8], edges: &mut Vec<ImportEdge>) {
        let line = node.start_position().row + 1;
        let Some(module) = node.child_by_field_name("module_name") else {
            return;
        };

        match module.kind() {
            "dotted_name" => edges.push(ImportEdge::new(Self::dotted_name(&module, src), line)),
            "relative_import" => {
                let mut prefix = String::new();
                let mut package = None;
                let mut cursor = module.walk();
                for child in module.children(&mut cursor) {
                    match child.kind() {
                        "import_prefix" => prefix = Self::text(&child, src).trim().to_owned(),
                        "dotted_name" => package = Some(Self::dotted_name(&child, src)),
                        _ => {}
                    }
                }

                if let Some(package) = package {
                    edges.push(ImportEdge::new(format!("{prefix}{package}"), line));
                    return;
                }

                // `from . import a, b` imports sibling modules.
                let mut cursor = node.walk();
                let names: Vec<String> = node
                    .children_by_field_name("name", &mut cursor)
                    .filter_map(|n| Self::imported_name(&n, src))
                    .collect();
                if names.is_empty() {
                    edges.push(ImportEdge::new(prefix, line));
                } else {
                    for name in names {
                        edges.push(ImportEdge::new(format!("{prefix}{name}"), line));
                    }
                }
            }
            _ => {}
        }
    }

    /// First error or missing node in a tree that has errors.
    fn first_error<'t>(root: Node<'t>) -> Option<Node<'t>> {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.is_error() || node.is_missing() {
                return Some(node);
            }
            if !node.has_error() {
                continue;
            }
            let mut cursor = node.walk();
            let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        None
    }

    fn syntax_error(root: Node<'_>, src: &[u8]) -> ExtractError {
        let Some(node) = Self::first_error(root) else {
            return ExtractError::Syntax {
                line: 1,
                column: 1,
                message: "invalid syntax".into(),
            };
        };

        let message = if node.is_missing() {
            format!("missing '{}'", node.kind())
        } else {
            let snippet: String = Self::text(&node, src)
                .lines()
                .next()
                .unwrap_or("")
                .chars()
                .take(40)
                .collect();
            if snippet.trim().is_empty() {
                "invalid syntax".to_owned()
            } else {
                format!("invalid syntax near '{}'", snippet.trim())
            }
        };

        ExtractError::Syntax {
            line: node.start_position().row + 1,
            column: node.start_position().column + 1,
            message,
        }
    }
}

impl Default for PythonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageExtractor for PythonExtractor {
    fn language_id(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".py", ".pyi"]
    }

    fn extract_imports(&self, source: &str) -> Result<Vec<ImportEdge>, ExtractError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| ExtractError::Language(e.to_string()))?;

        let src = source.as_bytes();
        let tree = parser.parse(src, None).ok_or(ExtractError::Aborted)?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(Self::syntax_error(root, src));
        }

        // Imports can sit anywhere: inside functions, `try` blocks, `if TYPE_CHECKING:`.
        let mut edges = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            match node.kind() {
                "import_statement" => Self::extract_import(&node, src, &mut edges),
                "import_from_statement" => Self::extract_import_from(&node, src, &mut edges),
                "future_import_statement" => edges.push(ImportEdge::new(
                    "__future__",
                    node.start_position().row + 1,
                )),
                _ => {
                    let mut cursor = node.walk();
                    let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
                    stack.extend(children.into_iter().rev());
                }
            }
        }

        edges.sort_by_key(|e| e.line);
        Ok(edges)
    }

    fn module_name(&self, path: &str) -> Option<String> {
        let stem = path
            .strip_suffix(".py")
            .or_else(|| path.strip_suffix(".pyi"))?;
        let mut parts: Vec<&str> = stem.split('/').filter(|p| !p.is_empty()).collect();
        if parts.last() == Some(&"__init__") {
            parts.pop();
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("."))
        }
    }

    fn resolve_relative(&self, importer: &str, target: &str) -> Option<String> {
        let rest = target.trim_start_matches('.');
        let level = target.len() - rest.len();
        if level == 0 {
            return Some(target.to_owned());
        }

        // The importer's package is its directory, for modules and `__init__.py` alike.
        let mut package: Vec<&str> = importer.split('/').filter(|p| !p.is_empty()).collect();
        package.pop();

        let up = level - 1;
        if up > package.len() {
            return None;
        }
        package.truncate(package.len() - up);
        if !rest.is_empty() {
            package.push(rest);
        }

        if package.is_empty() {
            None
        } else {
            Some(package.join("."))
        }
    }

    fn is_test_file(&self, file_name: &str) -> bool {
        let Some(stem) = file_name
            .strip_suffix(".py")
            .or_else(|| file_name.strip_suffix(".pyi"))
        else {
            return false;
        };
        stem.starts_with("test_") || stem.ends_with("_test") || stem == "conftest"
    }
}
