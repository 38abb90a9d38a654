//! Locating and loading `archgate.toml`.
//!
//! Lookup order, first hit wins:
//!
//! 1. `--config <path>`
//! 2. `<root>/archgate.toml`, then `<root>/.archgate.toml`
//! 3. `$ARCHGATE_CONFIG_DIR/config.toml`, else `~/.archgate/config.toml`
//! 4. the built-in layer map

use std::fmt;
use std::path::{Path, PathBuf};

use archgate_core::{ArchConfig, ConfigError};

/// Where the configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Passed with `--config`.
    Explicit(PathBuf),
    /// Found in the scanned root.
    Project(PathBuf),
    /// Found in the user-wide config directory.
    Global(PathBuf),
    /// Nothing found; built-in layers apply.
    BuiltIn,
}

impl ConfigSource {
    /// Path of the config file, if one was found.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Global(p) => Some(p),
            Self::BuiltIn => None,
        }
    }

    /// Reads the configuration this source points at.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid config.
    pub fn load(&self) -> Result<ArchConfig, ConfigError> {
        match self.path() {
            Some(path) => ArchConfig::from_file(path),
            None => Ok(ArchConfig::default()),
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(p) => write!(f, "{} (--config)", p.display()),
            Self::Project(p) => write!(f, "{}", p.display()),
            Self::Global(p) => write!(f, "{} (global)", p.display()),
            Self::BuiltIn => f.write_str("built-in layer map"),
        }
    }
}

/// File names looked up in the project root.
pub const PROJECT_CONFIG_NAMES: &[&str] = &["archgate.toml", ".archgate.toml"];

const GLOBAL_CONFIG_NAME: &str = "config.toml";

/// Finds the configuration for a scan of `root`.
#[must_use]
pub fn resolve(root: &Path, explicit: Option<&Path>) -> ConfigSource {
    resolve_with(root, explicit, global_config_dir())
}

fn resolve_with(root: &Path, explicit: Option<&Path>, global_dir: Option<PathBuf>) -> ConfigSource {
    // An explicit path is not checked here; loading reports a missing file.
    if let Some(path) = explicit {
        return ConfigSource::Explicit(path.to_path_buf());
    }

    if let Some(found) = PROJECT_CONFIG_NAMES
        .iter()
        .map(|name| root.join(name))
        .find(|candidate| candidate.is_file())
    {
        tracing::debug!("Using project config {}", found.display());
        return ConfigSource::Project(found);
    }

    match global_dir.map(|dir| dir.join(GLOBAL_CONFIG_NAME)) {
        Some(candidate) if candidate.is_file() => {
            tracing::debug!("Using global config {}", candidate.display());
            ConfigSource::Global(candidate)
        }
        _ => ConfigSource::BuiltIn,
    }
}

/// User-wide config directory: `$ARCHGATE_CONFIG_DIR`, else `~/.archgate`.
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    match std::env::var_os("ARCHGATE_CONFIG_DIR") {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => home::home_dir().map(|h| h.join(".archgate")),
    }
}
