//! `archgate layers`: show the effective layer map and policy.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;
use archgate_core::{ArchConfig, Layer, LayerResolver, RuleEngine};

use crate::config_resolver::{self, ConfigSource};

/// Runs `archgate layers`.
pub fn run(root: Option<&Path>, explicit: Option<&Path>) -> Result<()> {
    let source = config_resolver::resolve(root.unwrap_or(Path::new(".")), explicit);
    let config = load(&source)?;
    println!("Configuration: {source}\n");
    println!("{}", describe(&config));
    Ok(())
}

/// Loads the configuration and checks its rule tables. The scan root is
/// not checked.
fn load(source: &ConfigSource) -> Result<ArchConfig> {
    let config = source.load()?;
    config.validate_rules()?;
    Ok(config)
}

fn describe(config: &ArchConfig) -> String {
    let resolver = LayerResolver::new(config);
    let engine = RuleEngine::new(config);

    let mut out = String::from("Layer map (match priority order):\n");
    let width = resolver
        .entries()
        .map(|(prefix, _)| prefix.len())
        .max()
        .unwrap_or(0);
    for (prefix, layer) in resolver.entries() {
        let _ = writeln!(out, "  {prefix:<width$}  -> {layer}");
    }

    let _ = write!(out, "\nPolicy: {}", engine.mode());
    for name in config.layer_names() {
        let _ = write!(out, "\n  {name:<14} {}", engine.describe(&Layer::new(name)));
    }
    out
}
