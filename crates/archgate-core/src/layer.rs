//! Layer resolution: maps file paths and import targets to architecture layers.

use crate::config::{normalize_prefix, ArchConfig};
use crate::modules::ModuleIndex;
use crate::types::{Classification, Layer};

/// Resolves root-relative paths to architecture layers.
///
/// Resolution uses longest-prefix-match so that more specific path
/// prefixes (`adapter/legacy`) take priority over broader ones (`adapter`).
/// Equal-length prefixes keep declaration order, so the first one wins.
#[derive(Debug, Clone)]
pub struct LayerResolver {
    /// (path_prefix, layer) sorted by prefix length descending.
    map: Vec<(String, Layer)>,
}

impl LayerResolver {
    /// Build a resolver from config.
    #[must_use]
    pub fn new(config: &ArchConfig) -> Self {
        let mut map: Vec<(String, Layer)> = Vec::new();
        for layer in &config.layers {
            for prefix in &layer.paths {
                map.push((normalize_prefix(prefix), Layer::new(layer.name.as_str())));
            }
        }
        // Longest prefix first; the sort is stable so ties stay in declaration order.
        map.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self { map }
    }

    /// Which layer does this `/`-separated path belong to?
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&Layer> {
        self.map
            .iter()
            .find(|(prefix, _)| {
                path == prefix
                    || (path.starts_with(prefix.as_str())
                        && path.as_bytes().get(prefix.len()) == Some(&b'/'))
            })
            .map(|(_, layer)| layer)
    }

    /// Classify a source file by its root-relative path.
    ///
    /// Never returns [`Classification::External`].
    #[must_use]
    pub fn classify_path(&self, path: &str) -> Classification {
        match self.resolve(path) {
            Some(layer) => Classification::Layer(layer.clone()),
            None => Classification::Unknown,
        }
    }

    /// Classify an absolute dotted module name.
    ///
    /// The name is matched against the same prefixes as file paths. A name no
    /// prefix covers is project-local only if it names a scanned module (or a
    /// package or symbol of one); everything else is external.
    #[must_use]
    pub fn classify_import(&self, module: &str, index: &ModuleIndex) -> Classification {
        let as_path = module.replace('.', "/");
        if let Some(layer) = self.resolve(&as_path) {
            return Classification::Layer(layer.clone());
        }
        match index.lookup(module) {
            Some(file) => self.classify_path(file),
            None => Classification::External,
        }
    }

    /// Prefix table in match priority order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Layer)> {
        self.map.iter().map(|(p, l)| (p.as_str(), l))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerDef;

    fn make_config() -> ArchConfig {
        ArchConfig {
            layers: vec![
                LayerDef::new("domain", &["domain"]),
                LayerDef::new("app", &["application"]),
                LayerDef::new("adapter", &["adapter"]),
                LayerDef::new("legacy", &["adapter/legacy"]),
            ],
            ..ArchConfig::default()
        }
    }

    fn layer(c: &Classification) -> Option<&str> {
        c.layer().map(Layer::as_str)
    }

    #[test]
    fn resolves_exact_match() {
        let r = LayerResolver::new(&make_config());
        assert_eq!(r.resolve("domain").map(Layer::as_str), Some("domain"));
    }

    #[test]
    fn resolves_nested_path() {
        let r = LayerResolver::new(&make_config());
        let c = r.classify_path("domain/model/user.py");
        assert_eq!(layer(&c), Some("domain"));
    }

    #[test]
    fn resolves_longest_prefix() {
        let r = LayerResolver::new(&make_config());
        assert_eq!(layer(&r.classify_path("adapter/legacy/db.py")), Some("legacy"));
        assert_eq!(layer(&r.classify_path("adapter/http/api.py")), Some("adapter"));
    }

    #[test]
    fn longest_prefix_wins_regardless_of_declaration_order() {
        let config = ArchConfig {
            layers: vec![
                LayerDef::new("legacy", &["adapter/legacy"]),
                LayerDef::new("adapter", &["adapter"]),
            ],
            ..ArchConfig::default()
        };
        let r = LayerResolver::new(&config);
        assert_eq!(layer(&r.classify_path("adapter/legacy/db.py")), Some("legacy"));
    }

    #[test]
    fn tie_goes_to_first_declared() {
        let config = ArchConfig {
            layers: vec![
                LayerDef::new("first", &["shared"]),
                LayerDef::new("second", &["shared"]),
            ],
            ..ArchConfig::default()
        };
        let r = LayerResolver::new(&config);
        assert_eq!(layer(&r.classify_path("shared/x.py")), Some("first"));
    }

    #[test]
    fn unmapped_path_is_unknown() {
        let r = LayerResolver::new(&make_config());
        assert_eq!(r.classify_path("scripts/seed.py"), Classification::Unknown);
    }

    #[test]
    fn no_false_prefix_match() {
        let r = LayerResolver::new(&make_config());
        // "domains/x.py" should NOT match "domain"
        assert_eq!(r.classify_path("domains/x.py"), Classification::Unknown);
    }

    #[test]
    fn prefixes_are_normalized() {
        let config = ArchConfig {
            layers: vec![LayerDef::new("domain", &["./src/domain/"])],
            ..ArchConfig::default()
        };
        let r = LayerResolver::new(&config);
        assert_eq!(layer(&r.classify_path("src/domain/a.py")), Some("domain"));
    }

    #[test]
    fn import_uses_first_segment() {
        let r = LayerResolver::new(&make_config());
        let index = ModuleIndex::new();
        assert_eq!(
            layer(&r.classify_import("domain.model.entity", &index)),
            Some("domain")
        );
        assert_eq!(
            layer(&r.classify_import("adapter.legacy.db", &index)),
            Some("legacy")
        );
    }

    #[test]
    fn import_with_layer_keyword_elsewhere_is_external() {
        let r = LayerResolver::new(&make_config());
        let index = ModuleIndex::new();
        assert_eq!(
            r.classify_import("thirdparty.domain.tools", &index),
            Classification::External
        );
        assert_eq!(r.classify_import("os", &index), Classification::External);
    }

    #[test]
    fn local_unmapped_import_is_unknown() {
        let r = LayerResolver::new(&make_config());
        let mut index = ModuleIndex::new();
        index.insert("scripts.seed", "scripts/seed.py");
        assert_eq!(
            r.classify_import("scripts.seed", &index),
            Classification::Unknown
        );
        assert_eq!(r.classify_import("scripts", &index), Classification::Unknown);
    }

    #[test]
    fn entries_are_in_priority_order() {
        let r = LayerResolver::new(&make_config());
        let first = r.entries().next().map(|(p, _)| p);
        assert_eq!(first, Some("adapter/legacy"));
    }
}
