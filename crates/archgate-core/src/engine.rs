//! Architecture rule engine.
//!
//! Answers whether an edge between two classified modules is permitted
//! under the configured policy.

use std::collections::{HashMap, HashSet};

use crate::config::{ArchConfig, PolicyMode};
use crate::types::{Classification, Layer};

/// Verdict for a single dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeVerdict {
    /// Both sides are project layers and the policy permits the edge.
    Allowed,
    /// The target is third-party; layer rules do not apply.
    Exempt,
    /// Both sides are project layers and the policy forbids the edge.
    Denied,
    /// One side has no layer; the edge is neither allowed nor flagged.
    Unresolved,
}

#[derive(Debug, Clone)]
enum Policy {
    AllowList(HashMap<Layer, HashSet<Layer>>),
    Hierarchical(HashMap<Layer, u32>),
}

/// Evaluates layer dependency rules.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    policy: Policy,
}

impl RuleEngine {
    /// Create a new engine from config.
    #[must_use]
    pub fn new(config: &ArchConfig) -> Self {
        let policy = match config.policy {
            PolicyMode::AllowList => Policy::AllowList(
                config
                    .dependencies
                    .iter()
                    .map(|(layer, deps)| {
                        let targets = deps.iter().map(|d| Layer::new(d.as_str())).collect();
                        (Layer::new(layer.as_str()), targets)
                    })
                    .collect(),
            ),
            PolicyMode::Hierarchical => Policy::Hierarchical(
                config
                    .weights
                    .iter()
                    .map(|(layer, weight)| (Layer::new(layer.as_str()), *weight))
                    .collect(),
            ),
        };
        Self { policy }
    }

    /// Active policy mode.
    #[must_use]
    pub fn mode(&self) -> PolicyMode {
        match self.policy {
            Policy::AllowList(_) => PolicyMode::AllowList,
            Policy::Hierarchical(_) => PolicyMode::Hierarchical,
        }
    }

    /// May `source` depend on `target`?
    ///
    /// Same-layer edges are always allowed. A layer missing from the policy
    /// allows nothing but itself.
    #[must_use]
    pub fn is_allowed(&self, source: &Layer, target: &Layer) -> bool {
        if source == target {
            return true;
        }
        match &self.policy {
            Policy::AllowList(allowed) => allowed
                .get(source)
                .is_some_and(|targets| targets.contains(target)),
            Policy::Hierarchical(weights) => match (weights.get(source), weights.get(target)) {
                (Some(s), Some(t)) => t <= s,
                _ => false,
            },
        }
    }

    /// Evaluate an edge between two classifications.
    #[must_use]
    pub fn evaluate(&self, source: &Classification, target: &Classification) -> EdgeVerdict {
        match (source, target) {
            (_, Classification::External) | (Classification::External, _) => EdgeVerdict::Exempt,
            (Classification::Unknown, _) | (_, Classification::Unknown) => EdgeVerdict::Unresolved,
            (Classification::Layer(s), Classification::Layer(t)) => {
                if self.is_allowed(s, t) {
                    EdgeVerdict::Allowed
                } else {
                    EdgeVerdict::Denied
                }
            }
        }
    }

    /// Human-readable rule for `layer`, as listed by `archgate layers`.
    #[must_use]
    pub fn describe(&self, layer: &Layer) -> String {
        match &self.policy {
            Policy::AllowList(allowed) => {
                let mut targets: Vec<&str> = allowed
                    .get(layer)
                    .map(|t| t.iter().map(Layer::as_str).collect())
                    .unwrap_or_default();
                targets.sort_unstable();
                format!("may import [{}]", targets.join(", "))
            }
            Policy::Hierarchical(weights) => match weights.get(layer) {
                Some(w) => format!("weight {w}"),
                None => "no weight".to_owned(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerDef;

    fn allow_list_config() -> ArchConfig {
        ArchConfig {
            layers: vec![
                LayerDef::new("domain", &["domain"]),
                LayerDef::new("application", &["application"]),
                LayerDef::new("adapter", &["adapter"]),
            ],
            dependencies: [
                ("domain", vec!["domain"]),
                ("application", vec!["domain", "application"]),
                ("adapter", vec!["domain", "application", "adapter"]),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.into_iter().map(str::to_owned).collect()))
            .collect(),
            ..ArchConfig::default()
        }
    }

    fn hierarchical_config() -> ArchConfig {
        ArchConfig {
            layers: vec![
                LayerDef::new("domain", &["domain"]),
                LayerDef::new("application", &["application"]),
                LayerDef::new("interfaces", &["interfaces"]),
                LayerDef::new("api", &["api"]),
                LayerDef::new("infrastructure", &["infrastructure"]),
            ],
            policy: PolicyMode::Hierarchical,
            weights: [
                ("domain", 1),
                ("application", 2),
                ("interfaces", 3),
                ("api", 3),
                ("infrastructure", 4),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect(),
            ..ArchConfig::default()
        }
    }

    fn l(name: &str) -> Layer {
        Layer::new(name)
    }

    fn c(name: &str) -> Classification {
        Classification::Layer(l(name))
    }

    #[test]
    fn allows_listed_dependency() {
        let engine = RuleEngine::new(&allow_list_config());
        assert!(engine.is_allowed(&l("application"), &l("domain")));
        assert!(engine.is_allowed(&l("adapter"), &l("application")));
    }

    #[test]
    fn denies_unlisted_dependency() {
        let engine = RuleEngine::new(&allow_list_config());
        assert!(!engine.is_allowed(&l("domain"), &l("application")));
        assert!(!engine.is_allowed(&l("application"), &l("adapter")));
    }

    #[test]
    fn same_layer_is_always_allowed() {
        let mut config = allow_list_config();
        config.dependencies.insert("domain".into(), vec![]);
        let engine = RuleEngine::new(&config);
        assert!(engine.is_allowed(&l("domain"), &l("domain")));
    }

    #[test]
    fn external_is_exempt() {
        let engine = RuleEngine::new(&allow_list_config());
        assert_eq!(
            engine.evaluate(&c("domain"), &Classification::External),
            EdgeVerdict::Exempt
        );
    }

    #[test]
    fn unknown_is_unresolved() {
        let engine = RuleEngine::new(&allow_list_config());
        assert_eq!(
            engine.evaluate(&c("domain"), &Classification::Unknown),
            EdgeVerdict::Unresolved
        );
        assert_eq!(
            engine.evaluate(&Classification::Unknown, &c("adapter")),
            EdgeVerdict::Unresolved
        );
    }

    #[test]
    fn evaluate_maps_policy() {
        let engine = RuleEngine::new(&allow_list_config());
        assert_eq!(engine.evaluate(&c("domain"), &c("application")), EdgeVerdict::Denied);
        assert_eq!(engine.evaluate(&c("application"), &c("domain")), EdgeVerdict::Allowed);
    }

    #[test]
    fn hierarchical_allows_inward() {
        let engine = RuleEngine::new(&hierarchical_config());
        assert_eq!(engine.mode(), PolicyMode::Hierarchical);
        assert!(engine.is_allowed(&l("infrastructure"), &l("domain")));
        assert!(engine.is_allowed(&l("application"), &l("domain")));
    }

    #[test]
    fn hierarchical_denies_outward() {
        let engine = RuleEngine::new(&hierarchical_config());
        assert!(!engine.is_allowed(&l("domain"), &l("application")));
        assert!(!engine.is_allowed(&l("interfaces"), &l("infrastructure")));
    }

    #[test]
    fn hierarchical_same_weight_peers_are_allowed() {
        let engine = RuleEngine::new(&hierarchical_config());
        assert!(engine.is_allowed(&l("api"), &l("interfaces")));
        assert!(engine.is_allowed(&l("interfaces"), &l("api")));
    }

    #[test]
    fn narrowing_allow_list_only_adds_denials() {
        let wide = RuleEngine::new(&allow_list_config());
        let mut narrow_config = allow_list_config();
        narrow_config
            .dependencies
            .insert("adapter".into(), vec!["domain".into()]);
        let narrow = RuleEngine::new(&narrow_config);

        let names = ["domain", "application", "adapter"];
        for s in names {
            for t in names {
                if !wide.is_allowed(&l(s), &l(t)) {
                    assert!(!narrow.is_allowed(&l(s), &l(t)), "{s} -> {t}");
                }
            }
        }
        assert!(!narrow.is_allowed(&l("adapter"), &l("application")));
    }

    #[test]
    fn describe_lists_targets() {
        let engine = RuleEngine::new(&allow_list_config());
        assert_eq!(
            engine.describe(&l("application")),
            "may import [application, domain]"
        );
        let engine = RuleEngine::new(&hierarchical_config());
        assert_eq!(engine.describe(&l("api")), "weight 3");
    }
}
