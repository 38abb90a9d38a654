//! TOML configuration: analyzer options, layer map and dependency policy.
//!
//! ```toml
//! [analyzer]
//! root = "."
//! ignore_tests = true
//! ignored_packages = ["migrations"]
//!
//! [[layers]]
//! name = "domain"
//! paths = ["domain"]
//!
//! [policy]
//! mode = "allow-list"
//!
//! [dependencies]
//! domain = []
//! ```

use miette::{NamedSource, SourceSpan};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level architecture configuration.
///
/// Built once at startup and shared read-only for the whole run.
#[derive(Debug, Clone)]
pub struct ArchConfig {
    /// Scan options.
    pub analyzer: AnalyzerConfig,
    /// Layer definitions, in declaration order.
    pub layers: Vec<LayerDef>,
    /// Which dependency policy is active.
    pub policy: PolicyMode,
    /// Allow-list policy: layer name -> layers it may import.
    pub dependencies: BTreeMap<String, Vec<String>>,
    /// Hierarchical policy: layer name -> weight (lower is more central).
    pub weights: BTreeMap<String, u32>,
}

/// Options controlling the scan itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzerConfig {
    /// Project root directory.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Skip files recognized as tests.
    #[serde(default)]
    pub ignore_tests: bool,
    /// Substrings of paths and import names to leave out entirely.
    #[serde(default)]
    pub ignored_packages: Vec<String>,
    /// Worker threads (default: one per CPU core).
    #[serde(default)]
    pub jobs: Option<usize>,
    /// Abort the scan after this many seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            ignore_tests: false,
            ignored_packages: Vec::new(),
            jobs: None,
            timeout_secs: None,
        }
    }
}

impl AnalyzerConfig {
    /// The configured timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// A named architecture layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerDef {
    /// Layer name (e.g., `"domain"`, `"adapter"`).
    pub name: String,
    /// Root-relative path prefixes belonging to this layer.
    pub paths: Vec<String>,
}

impl LayerDef {
    /// Creates a layer definition.
    #[must_use]
    pub fn new(name: &str, paths: &[&str]) -> Self {
        Self {
            name: name.to_owned(),
            paths: paths.iter().map(|p| (*p).to_owned()).collect(),
        }
    }
}

/// Dependency policy selected at configuration time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyMode {
    /// Each layer lists the layers it may import.
    #[default]
    AllowList,
    /// A layer may import layers of equal or lower weight.
    Hierarchical,
}

impl std::fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AllowList => write!(f, "allow-list"),
            Self::Hierarchical => write!(f, "hierarchical"),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

/// Errors when loading or validating configuration. All of them are fatal.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ConfigError {
    /// Failed to read config file.
    #[error("failed to read {path}: {source}")]
    #[diagnostic(code(archgate::config::io))]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// IO error.
        source: std::io::Error,
    },
    /// Failed to parse TOML.
    #[error("invalid config: {message}")]
    #[diagnostic(code(archgate::config::parse))]
    Parse {
        /// Parse error detail.
        message: String,
        /// The offending document.
        #[source_code]
        src: NamedSource<String>,
        /// Where the parser gave up.
        #[label("here")]
        span: Option<SourceSpan>,
    },
    /// No layers are declared.
    #[error("no layers declared")]
    #[diagnostic(
        code(archgate::config::empty_layer_map),
        help("add at least one [[layers]] entry with a name and path prefixes")
    )]
    EmptyLayerMap,
    /// The scan root is missing or not a directory.
    #[error("invalid root {}: {reason}", .path.display())]
    #[diagnostic(code(archgate::config::root))]
    InvalidRoot {
        /// Root that was rejected.
        path: PathBuf,
        /// Why it was rejected.
        reason: &'static str,
    },
    /// Config is structurally invalid.
    #[error("config validation: {0}")]
    #[diagnostic(
        code(archgate::config::invalid),
        help("every declared layer needs an entry in [dependencies] (allow-list) or [weights] (hierarchical)")
    )]
    Validation(String),
}

impl Default for ArchConfig {
    /// The layered layout `domain / application / adapter / api / cmd / config / util`,
    /// each mapped to its same-named top-level directory.
    fn default() -> Self {
        let allow = |deps: &[&str]| deps.iter().map(|d| (*d).to_owned()).collect::<Vec<_>>();
        let layers = ["domain", "application", "adapter", "api", "cmd", "config", "util"]
            .into_iter()
            .map(|name| LayerDef::new(name, &[name]))
            .collect();

        let dependencies = [
            ("domain", allow(&["domain"])),
            ("application", allow(&["domain", "application"])),
            ("adapter", allow(&["domain", "application", "adapter"])),
            ("api", allow(&["domain", "application", "api"])),
            (
                "cmd",
                allow(&["domain", "application", "adapter", "api", "cmd", "config", "util"]),
            ),
            ("config", allow(&["config"])),
            ("util", allow(&["util"])),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect();

        Self {
            analyzer: AnalyzerConfig::default(),
            layers,
            policy: PolicyMode::AllowList,
            dependencies,
            weights: BTreeMap::new(),
        }
    }
}

impl ArchConfig {
    /// Load from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse_named(&content, &path.display().to_string())
    }

    /// Parse from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Self::parse_named(content, "archgate.toml")
    }

    fn parse_named(content: &str, name: &str) -> Result<Self, ConfigError> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct RawConfig {
            #[serde(default)]
            analyzer: AnalyzerConfig,
            #[serde(rename = "layers", default)]
            layers: Vec<LayerDef>,
            #[serde(default)]
            policy: PolicySection,
            #[serde(default)]
            dependencies: BTreeMap<String, Vec<String>>,
            #[serde(default)]
            weights: BTreeMap<String, u32>,
        }

        #[derive(Deserialize, Default)]
        #[serde(deny_unknown_fields)]
        struct PolicySection {
            #[serde(default)]
            mode: PolicyMode,
        }

        let raw: RawConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.message().to_owned(),
            span: e.span().map(SourceSpan::from),
            src: NamedSource::new(name, content.to_owned()),
        })?;

        Ok(Self {
            analyzer: raw.analyzer,
            layers: raw.layers,
            policy: raw.policy.mode,
            dependencies: raw.dependencies,
            weights: raw.weights,
        })
    }

    /// Names of all declared layers, in declaration order.
    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.name.as_str())
    }

    /// Validate config consistency, including the scan root.
    ///
    /// # Errors
    ///
    /// Returns error describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_rules()?;

        let root = &self.analyzer.root;
        if !root.exists() {
            return Err(ConfigError::InvalidRoot {
                path: root.clone(),
                reason: "does not exist",
            });
        }
        if !root.is_dir() {
            return Err(ConfigError::InvalidRoot {
                path: root.clone(),
                reason: "is not a directory",
            });
        }

        Ok(())
    }

    /// Validate the layer map, the policy tables and the analyzer limits.
    /// The scan root is not touched.
    ///
    /// # Errors
    ///
    /// Returns error describing the first problem found.
    pub fn validate_rules(&self) -> Result<(), ConfigError> {
        if self.layers.is_empty() {
            return Err(ConfigError::EmptyLayerMap);
        }

        let mut layer_names: HashSet<&str> = HashSet::new();
        for layer in &self.layers {
            if layer.name.trim().is_empty() {
                return Err(ConfigError::Validation("layer with empty name".into()));
            }
            if !layer_names.insert(layer.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "layer '{}' declared more than once",
                    layer.name
                )));
            }
            if layer.paths.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "layer '{}' has no path prefixes",
                    layer.name
                )));
            }
            for path in &layer.paths {
                if path.starts_with('/') || path.contains(':') {
                    return Err(ConfigError::Validation(format!(
                        "layer '{}': prefix '{path}' must be relative to the root",
                        layer.name
                    )));
                }
                if normalize_prefix(path).is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "layer '{}': empty path prefix",
                        layer.name
                    )));
                }
            }
        }

        match self.policy {
            PolicyMode::AllowList => self.validate_allow_list(&layer_names)?,
            PolicyMode::Hierarchical => self.validate_weights(&layer_names)?,
        }

        if self.analyzer.jobs == Some(0) {
            return Err(ConfigError::Validation("analyzer.jobs must be at least 1".into()));
        }
        if self.analyzer.timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "analyzer.timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    fn validate_allow_list(&self, layer_names: &HashSet<&str>) -> Result<(), ConfigError> {
        for (layer, deps) in &self.dependencies {
            if !layer_names.contains(layer.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "dependencies.{layer}: unknown layer"
                )));
            }
            for dep in deps {
                if !layer_names.contains(dep.as_str()) {
                    return Err(ConfigError::Validation(format!(
                        "dependencies.{layer}: unknown dep '{dep}'"
                    )));
                }
            }
        }

        for l in &self.layers {
            if !self.dependencies.contains_key(&l.name) {
                return Err(ConfigError::Validation(format!(
                    "layer '{}' has no entry in [dependencies]",
                    l.name
                )));
            }
        }
        Ok(())
    }

    fn validate_weights(&self, layer_names: &HashSet<&str>) -> Result<(), ConfigError> {
        for layer in self.weights.keys() {
            if !layer_names.contains(layer.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "weights.{layer}: unknown layer"
                )));
            }
        }
        for l in &self.layers {
            if !self.weights.contains_key(&l.name) {
                return Err(ConfigError::Validation(format!(
                    "layer '{}' has no entry in [weights]",
                    l.name
                )));
            }
        }
        Ok(())
    }
}

/// Canonical form of a layer path prefix: `/`-separated, no leading `./`,
/// no trailing separator.
#[must_use]
pub fn normalize_prefix(prefix: &str) -> String {
    let unified = prefix.replace('\\', "/");
    let mut s = unified.as_str();
    while let Some(rest) = s.strip_prefix("./") {
        s = rest;
    }
    s.trim_matches('/').to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[[layers]]
name = "domain"
paths = ["domain"]

[dependencies]
domain = []
"#;
        let config = ArchConfig::parse(toml).expect("parse failed");
        assert_eq!(config.layers.len(), 1);
        assert_eq!(config.layers[0].name, "domain");
        assert_eq!(config.policy, PolicyMode::AllowList);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[analyzer]
root = "."
ignore_tests = true
ignored_packages = ["migrations", "scripts"]
jobs = 4
timeout_secs = 30

[[layers]]
name = "domain"
paths = ["domain"]

[[layers]]
name = "adapter"
paths = ["adapter", "infra/db"]

[policy]
mode = "allow-list"

[dependencies]
domain = []
adapter = ["domain"]
"#;
        let config = ArchConfig::parse(toml).expect("parse failed");
        assert!(config.analyzer.ignore_tests);
        assert_eq!(config.analyzer.ignored_packages, vec!["migrations", "scripts"]);
        assert_eq!(config.analyzer.jobs, Some(4));
        assert_eq!(config.analyzer.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.layers[1].paths, vec!["adapter", "infra/db"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_hierarchical_config() {
        let toml = r#"
[[layers]]
name = "domain"
paths = ["domain"]

[[layers]]
name = "application"
paths = ["application"]

[policy]
mode = "hierarchical"

[weights]
domain = 1
application = 2
"#;
        let config = ArchConfig::parse(toml).expect("parse failed");
        assert_eq!(config.policy, PolicyMode::Hierarchical);
        assert_eq!(config.weights.get("application"), Some(&2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_rejects_unknown_section() {
        let err = ArchConfig::parse("[rules]\nfoo = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn parse_error_carries_span() {
        let err = ArchConfig::parse("[[layers]]\nname = \n").unwrap_err();
        match err {
            ConfigError::Parse { span, .. } => assert!(span.is_some()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn default_config_is_valid() {
        let config = ArchConfig::default();
        assert_eq!(config.layers.len(), 7);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.dependencies.get("application"),
            Some(&vec!["domain".to_owned(), "application".to_owned()])
        );
    }

    #[test]
    fn validate_catches_empty_layer_map() {
        let config = ArchConfig::parse("").expect("parse failed");
        assert!(matches!(config.validate(), Err(ConfigError::EmptyLayerMap)));
    }

    #[test]
    fn validate_catches_unknown_layer_in_deps() {
        let toml = r#"
[[layers]]
name = "domain"
paths = ["domain"]

[dependencies]
domain = ["nonexistent"]
"#;
        let config = ArchConfig::parse(toml).expect("parse failed");
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_missing_dep_entry() {
        let toml = r#"
[[layers]]
name = "domain"
paths = ["domain"]

[[layers]]
name = "app"
paths = ["app"]

[dependencies]
domain = []
"#;
        let config = ArchConfig::parse(toml).expect("parse failed");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("app"));
    }

    #[test]
    fn validate_catches_missing_weight() {
        let toml = r#"
[[layers]]
name = "domain"
paths = ["domain"]

[[layers]]
name = "api"
paths = ["api"]

[policy]
mode = "hierarchical"

[weights]
domain = 1
"#;
        let config = ArchConfig::parse(toml).expect("parse failed");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("api"));
    }

    #[test]
    fn validate_accepts_self_dependency() {
        let toml = r#"
[[layers]]
name = "domain"
paths = ["domain"]

[dependencies]
domain = ["domain"]
"#;
        let config = ArchConfig::parse(toml).expect("parse failed");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_catches_duplicate_layer() {
        let mut config = ArchConfig::default();
        config.layers.push(LayerDef::new("domain", &["core"]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_bad_prefixes() {
        let mut config = ArchConfig::default();
        config.layers[0].paths = vec!["./".into()];
        assert!(config.validate().is_err());

        let mut config = ArchConfig::default();
        config.layers[0].paths = vec!["/abs/domain".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_missing_root() {
        let mut config = ArchConfig::default();
        config.analyzer.root = PathBuf::from("/definitely/not/here/archgate");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRoot { .. })
        ));
    }

    #[test]
    fn validate_rules_ignores_root() {
        let mut config = ArchConfig::default();
        config.analyzer.root = PathBuf::from("/definitely/not/here/archgate");
        assert!(config.validate_rules().is_ok());

        config.dependencies.remove("util");
        let err = config.validate_rules().unwrap_err();
        assert!(err.to_string().contains("util"));
    }

    #[test]
    fn validate_catches_zero_jobs() {
        let mut config = ArchConfig::default();
        config.analyzer.jobs = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn normalize_prefix_strips_decoration() {
        assert_eq!(normalize_prefix("./adapter/legacy/"), "adapter/legacy");
        assert_eq!(normalize_prefix("adapter\\legacy"), "adapter/legacy");
        assert_eq!(normalize_prefix("domain"), "domain");
        assert_eq!(normalize_prefix("./"), "");
    }
}
