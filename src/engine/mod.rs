use std::sync::Arc;

use crate::batch::{self, BatchConfig, BatchReport, BatchRequest, CancelFlag, ProgressSink};
use crate::consensus::{self, StrategyWeights};
use crate::error::EngineError;
use crate::models::{FeatureSnapshot, Recommendation, StrategyId, StrategyOutcome};
use crate::provider::{FeatureProvider, Period};
use crate::strategy::StrategyRegistry;

/// Ties a feature provider to the strategy registry and turns symbols into
/// recommendations.
///
/// The engine itself holds no mutable state, so one instance behind an `Arc`
/// serves any number of concurrent evaluations.
pub struct RecommendationEngine {
    provider: Arc<dyn FeatureProvider>,
    registry: StrategyRegistry,
}

impl RecommendationEngine {
    pub fn new(provider: Arc<dyn FeatureProvider>) -> Self {
        Self::with_registry(provider, StrategyRegistry::with_defaults())
    }

    pub fn with_registry(provider: Arc<dyn FeatureProvider>, registry: StrategyRegistry) -> Self {
        Self { provider, registry }
    }

    /// Fetches features for one symbol and scores it with the requested
    /// strategies. The symbol is normalized to uppercase before the fetch.
    pub async fn evaluate_one(
        &self,
        symbol: &str,
        strategies: &[StrategyId],
        weights: &StrategyWeights,
        period: Period,
    ) -> Result<Recommendation, EngineError> {
        let symbol = symbol.trim().to_uppercase();
        let snapshot = self.provider.fetch(&symbol, period).await?;
        self.evaluate_snapshot(&snapshot, strategies, weights)
    }

    /// Scores an already-fetched snapshot. No I/O happens here.
    ///
    /// A strategy that cannot score the snapshot is recorded as a failed
    /// outcome and the rest carry the recommendation; only an unknown
    /// strategy id or a full wipeout aborts the evaluation.
    pub fn evaluate_snapshot(
        &self,
        snapshot: &FeatureSnapshot,
        strategies: &[StrategyId],
        weights: &StrategyWeights,
    ) -> Result<Recommendation, EngineError> {
        let mut outcomes = Vec::with_capacity(strategies.len());
        for &id in strategies {
            let Some(strategy) = self.registry.get(id) else {
                return Err(EngineError::UnknownStrategy(id.as_str().to_string()));
            };
            let outcome = match strategy.evaluate(snapshot) {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::warn!(
                        "⚠️ {} strategy could not score {}: {}",
                        id,
                        snapshot.symbol,
                        err
                    );
                    StrategyOutcome::failed(id, err.to_string())
                }
            };
            outcomes.push(outcome);
        }
        consensus::aggregate(&snapshot.symbol, snapshot.as_of, outcomes, weights)
    }

    /// Evaluates many symbols concurrently. See [`batch::run_batch`].
    pub async fn evaluate_batch(
        self: Arc<Self>,
        request: BatchRequest,
        config: BatchConfig,
        sink: Arc<dyn ProgressSink>,
        cancel: CancelFlag,
    ) -> BatchReport {
        batch::run_batch(self, request, config, sink, cancel).await
    }
}
