//! `archgate init`: write a starter configuration.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::config_resolver::PROJECT_CONFIG_NAMES;

const ALLOW_LIST_TEMPLATE: &str = r#"# archgate configuration
#
# Every source file belongs to the layer with the longest matching path
# prefix. Imports of modules under another layer must be listed below.

[analyzer]
root = "."
ignore_tests = false
# Substrings of paths / import names to skip entirely.
ignored_packages = []
# jobs = 4
# timeout_secs = 300

[[layers]]
name = "domain"
paths = ["domain"]

[[layers]]
name = "application"
paths = ["application"]

[[layers]]
name = "adapter"
paths = ["adapter"]

[[layers]]
name = "api"
paths = ["api"]

[[layers]]
name = "cmd"
paths = ["cmd"]

[[layers]]
name = "config"
paths = ["config"]

[[layers]]
name = "util"
paths = ["util"]

[policy]
mode = "allow-list"

# layer -> layers it may import. Same-layer imports are always allowed.
[dependencies]
domain = ["domain"]
application = ["domain", "application"]
adapter = ["domain", "application", "adapter"]
api = ["domain", "application", "api"]
cmd = ["domain", "application", "adapter", "api", "cmd", "config", "util"]
config = ["config"]
util = ["util"]
"#;

const HIERARCHICAL_TEMPLATE: &str = r#"# archgate configuration (hierarchical)
#
# Each layer has a weight; lower is more central. A layer may import only
# layers whose weight is less than or equal to its own.

[analyzer]
root = "."
ignore_tests = true
ignored_packages = []

[[layers]]
name = "domain"
paths = ["domain"]

[[layers]]
name = "application"
paths = ["application"]

[[layers]]
name = "interfaces"
paths = ["interfaces"]

[[layers]]
name = "infrastructure"
paths = ["infrastructure"]

[policy]
mode = "hierarchical"

[weights]
domain = 1
application = 2
interfaces = 3
infrastructure = 4
"#;

/// Runs `archgate init`.
pub fn run(root: Option<&Path>, force: bool, hierarchical: bool) -> Result<()> {
    let dir = root.unwrap_or(Path::new("."));
    let config_path = dir.join(PROJECT_CONFIG_NAMES[0]);

    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, template(hierarchical))
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("Created {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Point each [[layers]] entry at your package directories");
    if hierarchical {
        println!("  2. Adjust [weights]");
    } else {
        println!("  2. Adjust [dependencies]");
    }
    println!("  3. Run: archgate layers, then archgate");

    Ok(())
}

fn template(hierarchical: bool) -> &'static str {
    if hierarchical {
        HIERARCHICAL_TEMPLATE
    } else {
        ALLOW_LIST_TEMPLATE
    }
}
