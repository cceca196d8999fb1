// Strategy variants and their registry
pub mod model;
pub mod quantitative;
pub mod technical;

pub use model::ModelStrategy;
pub use quantitative::QuantStrategy;
pub use technical::TechnicalStrategy;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::StrategyError;
use crate::models::{FeatureSnapshot, StrategyId, StrategyOutcome};

/// A single lens over one symbol's features.
///
/// Implementations are pure: same snapshot in, same outcome out. A missing
/// or unusable feature surfaces as an error; the engine records it as a
/// failed outcome instead of aborting sibling strategies.
pub trait Strategy: Send + Sync {
    /// Stable identifier used for registry lookup, weights and reports.
    fn id(&self) -> StrategyId;

    /// Score one snapshot.
    fn evaluate(&self, snapshot: &FeatureSnapshot) -> Result<StrategyOutcome, StrategyError>;
}

/// Strategy lookup by stable id. Adding a variant means implementing
/// [`Strategy`] and registering it here.
pub struct StrategyRegistry {
    strategies: HashMap<StrategyId, Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Registry with the three production variants.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TechnicalStrategy));
        registry.register(Arc::new(QuantStrategy));
        registry.register(Arc::new(ModelStrategy::new()));
        registry
    }

    /// Later registrations replace earlier ones with the same id.
    pub fn register(&mut self, strategy: Arc<dyn Strategy>) {
        self.strategies.insert(strategy.id(), strategy);
    }

    pub fn get(&self, id: StrategyId) -> Option<Arc<dyn Strategy>> {
        self.strategies.get(&id).map(Arc::clone)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Map a score magnitude to a confidence figure on the 0-100 scale.
///
/// Piecewise by action band, capped at 90. The mapping restarts at each
/// band edge: a score entering the strong band opens at 60%.
pub(crate) fn confidence_from_score(score: f64) -> f64 {
    let magnitude = score.abs();
    let confidence = if magnitude >= 60.0 {
        (0.6 + (magnitude - 60.0) * 0.01).min(0.9)
    } else if magnitude >= 25.0 {
        0.5 + (magnitude - 25.0) * 0.01
    } else {
        0.3 + magnitude * 0.005
    };
    confidence * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_defaults_hold_all_variants() {
        let registry = StrategyRegistry::with_defaults();
        assert_eq!(registry.len(), 3);
        for id in StrategyId::ALL {
            assert!(registry.get(id).is_some(), "missing {id}");
        }
    }

    #[test]
    fn test_registry_lookup_returns_matching_id() {
        let registry = StrategyRegistry::with_defaults();
        let strategy = registry.get(StrategyId::Quantitative).unwrap();
        assert_eq!(strategy.id(), StrategyId::Quantitative);
    }

    #[test]
    fn test_empty_registry() {
        let registry = StrategyRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get(StrategyId::Technical).is_none());
    }

    #[test]
    fn test_confidence_mapping_per_band() {
        assert!((confidence_from_score(0.0) - 30.0).abs() < 1e-9);
        assert!((confidence_from_score(20.0) - 40.0).abs() < 1e-9);
        assert!((confidence_from_score(25.0) - 50.0).abs() < 1e-9);
        assert!((confidence_from_score(59.0) - 84.0).abs() < 1e-9);
        assert!((confidence_from_score(60.0) - 60.0).abs() < 1e-9);
        assert!((confidence_from_score(90.0) - 90.0).abs() < 1e-9);
        // capped
        assert!((confidence_from_score(100.0) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_symmetric_in_sign() {
        assert_eq!(confidence_from_score(-40.0), confidence_from_score(40.0));
    }
}
