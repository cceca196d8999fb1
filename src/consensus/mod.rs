// Weighted merge of strategy outcomes into one recommendation
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::{Action, Consensus, Recommendation, StrategyId, StrategyOutcome};

/// Max pairwise score spread that still counts as the strategies speaking
/// with one voice.
const PROXIMITY_SPREAD: f64 = 40.0;

/// Per-strategy blend weights. Always passed explicitly through the call
/// chain; `Default` carries the production blend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StrategyWeights {
    pub technical: f64,
    pub quantitative: f64,
    pub model: f64,
}

impl Default for StrategyWeights {
    fn default() -> Self {
        Self {
            technical: 0.40,
            quantitative: 0.35,
            model: 0.25,
        }
    }
}

impl StrategyWeights {
    pub fn get(&self, id: StrategyId) -> f64 {
        match id {
            StrategyId::Technical => self.technical,
            StrategyId::Quantitative => self.quantitative,
            StrategyId::Model => self.model,
        }
    }
}

/// Merge all attempted outcomes into a single recommendation.
///
/// Failed outcomes are excluded from the numbers but retained in the
/// result. Surviving weights are renormalized to sum 1, so one failed
/// strategy redistributes its influence instead of deflating the score.
///
/// Errors with [`EngineError::AllStrategiesFailed`] when nothing survives
/// (or the surviving weights sum to zero); that failure is terminal for the
/// symbol and must not be retried.
pub fn aggregate(
    symbol: &str,
    as_of: DateTime<Utc>,
    outcomes: Vec<StrategyOutcome>,
    weights: &StrategyWeights,
) -> Result<Recommendation, EngineError> {
    let survivors: Vec<&StrategyOutcome> = outcomes.iter().filter(|o| !o.is_failed()).collect();

    let total_weight: f64 = survivors.iter().map(|o| weights.get(o.strategy)).sum();
    if survivors.is_empty() || total_weight <= 0.0 {
        return Err(EngineError::AllStrategiesFailed {
            symbol: symbol.to_string(),
        });
    }

    let mut score = 0.0;
    let mut confidence = 0.0;
    for outcome in &survivors {
        let weight = weights.get(outcome.strategy) / total_weight;
        score += weight * outcome.score;
        confidence += weight * outcome.confidence;
    }
    let score = score.clamp(-100.0, 100.0);
    let confidence = confidence.clamp(0.0, 100.0);

    let consensus = consensus_level(&survivors);
    let action = Action::from_score(score);

    tracing::debug!(
        "{} aggregated: score {:.1}, {} of {} strategies, consensus {}",
        symbol,
        score,
        survivors.len(),
        outcomes.len(),
        consensus
    );

    Ok(Recommendation {
        symbol: symbol.to_string(),
        as_of,
        score,
        confidence,
        action,
        consensus,
        outcomes,
    })
}

/// Directional unanimity with tight spread is strong; a bare majority (or
/// unanimity with scattered magnitudes) is moderate; a split is weak.
fn consensus_level(survivors: &[&StrategyOutcome]) -> Consensus {
    let n = survivors.len();
    let non_negative = survivors.iter().filter(|o| o.score >= 0.0).count();
    let non_positive = survivors.iter().filter(|o| o.score <= 0.0).count();

    if non_negative == n || non_positive == n {
        let max = survivors.iter().map(|o| o.score).fold(f64::MIN, f64::max);
        let min = survivors.iter().map(|o| o.score).fold(f64::MAX, f64::min);
        if max - min <= PROXIMITY_SPREAD {
            Consensus::Strong
        } else {
            Consensus::Moderate
        }
    } else if non_negative.max(non_positive) * 2 > n {
        Consensus::Moderate
    } else {
        Consensus::Weak
    }
}
