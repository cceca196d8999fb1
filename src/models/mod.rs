use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::StrategyError;

/// Canonical feature names the providers emit and the strategies read.
///
/// Indicators arrive precomputed; nothing in this crate derives them from
/// raw price history.
pub mod features {
    pub const PRICE: &str = "price";
    pub const PREV_CLOSE: &str = "prev_close";
    pub const PRICE_CHANGE_PCT: &str = "price_change_pct";
    pub const VOLUME: &str = "volume";
    pub const AVG_VOLUME: &str = "avg_volume";
    pub const VOLUME_RATIO: &str = "volume_ratio";
    pub const RSI: &str = "rsi";
    pub const MACD: &str = "macd";
    pub const MACD_SIGNAL: &str = "macd_signal";
    pub const MACD_HIST: &str = "macd_hist";
    pub const SMA_SHORT: &str = "sma_short";
    pub const SMA_LONG: &str = "sma_long";
    pub const BB_UPPER: &str = "bb_upper";
    pub const BB_LOWER: &str = "bb_lower";
    pub const RETURNS_SHORT_PCT: &str = "returns_short_pct";
    pub const RETURNS_MEDIUM_PCT: &str = "returns_medium_pct";
    pub const VOLATILITY: &str = "volatility";
    pub const VOLATILITY_P25: &str = "volatility_p25";
    pub const VOLATILITY_P75: &str = "volatility_p75";
}

/// Point-in-time view of one symbol: everything a strategy is allowed to see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    pub symbol: String,
    pub as_of: DateTime<Utc>,
    pub features: HashMap<String, f64>,
}

impl FeatureSnapshot {
    pub fn new(
        symbol: impl Into<String>,
        as_of: DateTime<Utc>,
        features: HashMap<String, f64>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            as_of,
            features,
        }
    }

    /// Look up a named feature.
    ///
    /// Absent or non-finite values are hard errors. Strategies must never
    /// score off a silently defaulted number.
    pub fn feature(&self, name: &str) -> Result<f64, StrategyError> {
        match self.features.get(name) {
            Some(value) if value.is_finite() => Ok(*value),
            Some(value) => Err(StrategyError::BadValue(name.to_string(), *value)),
            None => Err(StrategyError::MissingFeature(name.to_string())),
        }
    }
}

/// Stable identifier for a strategy variant. Registry keys and report
/// entries both use this, so the wire form never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyId {
    Technical,
    Quantitative,
    Model,
}

impl StrategyId {
    pub const ALL: [StrategyId; 3] = [
        StrategyId::Technical,
        StrategyId::Quantitative,
        StrategyId::Model,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::Technical => "technical",
            StrategyId::Quantitative => "quantitative",
            StrategyId::Model => "model",
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One strategy's verdict on one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyOutcome {
    pub strategy: StrategyId,
    /// Clamped to [-100, +100] on construction.
    pub score: f64,
    /// Clamped to [0, 100] on construction.
    pub confidence: f64,
    pub reasons: Vec<String>,
    /// Set when the strategy could not score the snapshot. Failed outcomes
    /// are excluded from aggregation but kept in the recommendation so the
    /// caller can see what was attempted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl StrategyOutcome {
    pub fn scored(
        strategy: StrategyId,
        score: f64,
        confidence: f64,
        reasons: Vec<String>,
    ) -> Self {
        Self {
            strategy,
            score: score.clamp(-100.0, 100.0),
            confidence: confidence.clamp(0.0, 100.0),
            reasons,
            failure: None,
        }
    }

    pub fn failed(strategy: StrategyId, reason: impl Into<String>) -> Self {
        Self {
            strategy,
            score: 0.0,
            confidence: 0.0,
            reasons: Vec::new(),
            failure: Some(reason.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Recommended position change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl Action {
    /// Threshold mapping for a combined score. Boundaries are inclusive:
    /// exactly +25 buys, exactly -25 still holds, exactly -60 sells.
    pub fn from_score(score: f64) -> Self {
        if score >= 60.0 {
            Action::StrongBuy
        } else if score >= 25.0 {
            Action::Buy
        } else if score >= -25.0 {
            Action::Hold
        } else if score >= -60.0 {
            Action::Sell
        } else {
            Action::StrongSell
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Action::StrongBuy => "STRONG BUY",
            Action::Buy => "BUY",
            Action::Hold => "HOLD",
            Action::Sell => "SELL",
            Action::StrongSell => "STRONG SELL",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How much the surviving strategies agree with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consensus {
    /// Same direction, scores close together.
    Strong,
    /// Majority direction agreement, or unanimity with scattered magnitudes.
    Moderate,
    /// Strategies disagree on direction.
    Weak,
}

impl fmt::Display for Consensus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Consensus::Strong => "strong",
            Consensus::Moderate => "moderate",
            Consensus::Weak => "weak",
        };
        f.write_str(s)
    }
}

/// Display bucket for how much trust to put in a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        };
        f.write_str(s)
    }
}

/// Combined verdict for one symbol after aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub symbol: String,
    pub as_of: DateTime<Utc>,
    pub score: f64,
    pub confidence: f64,
    pub action: Action,
    pub consensus: Consensus,
    /// Every attempted strategy, failed ones marked via `failure`.
    pub outcomes: Vec<StrategyOutcome>,
}

impl Recommendation {
    /// Low confidence or disagreeing strategies make a call riskier than
    /// its absolute score suggests.
    pub fn risk_level(&self) -> RiskLevel {
        if self.confidence < 40.0 || self.consensus == Consensus::Weak {
            RiskLevel::High
        } else if self.confidence < 60.0 || self.consensus == Consensus::Moderate {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with(pairs: &[(&str, f64)]) -> FeatureSnapshot {
        let features = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect::<HashMap<_, _>>();
        FeatureSnapshot::new("TEST", Utc::now(), features)
    }

    #[test]
    fn test_feature_lookup() {
        let snapshot = snapshot_with(&[(features::RSI, 45.0)]);
        assert_eq!(snapshot.feature(features::RSI).unwrap(), 45.0);
    }

    #[test]
    fn test_missing_feature_names_the_feature() {
        let snapshot = snapshot_with(&[]);
        let err = snapshot.feature(features::RSI).unwrap_err();
        assert!(err.to_string().contains("rsi"));
    }

    #[test]
    fn test_non_finite_feature_is_rejected() {
        let snapshot = snapshot_with(&[(features::RSI, f64::NAN)]);
        assert!(snapshot.feature(features::RSI).is_err());

        let snapshot = snapshot_with(&[(features::RSI, f64::INFINITY)]);
        assert!(snapshot.feature(features::RSI).is_err());
    }

    #[test]
    fn test_outcome_clamps_bounds() {
        let outcome = StrategyOutcome::scored(StrategyId::Technical, 250.0, 180.0, vec![]);
        assert_eq!(outcome.score, 100.0);
        assert_eq!(outcome.confidence, 100.0);

        let outcome = StrategyOutcome::scored(StrategyId::Technical, -250.0, -5.0, vec![]);
        assert_eq!(outcome.score, -100.0);
        assert_eq!(outcome.confidence, 0.0);
    }

    #[test]
    fn test_failed_outcome_carries_no_score() {
        let outcome = StrategyOutcome::failed(StrategyId::Model, "missing feature `rsi`");
        assert!(outcome.is_failed());
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.confidence, 0.0);
    }

    #[test]
    fn test_action_thresholds_inclusive() {
        assert_eq!(Action::from_score(60.0), Action::StrongBuy);
        assert_eq!(Action::from_score(59.9), Action::Buy);
        assert_eq!(Action::from_score(25.0), Action::Buy);
        assert_eq!(Action::from_score(24.9), Action::Hold);
        assert_eq!(Action::from_score(0.0), Action::Hold);
        assert_eq!(Action::from_score(-25.0), Action::Hold);
        assert_eq!(Action::from_score(-25.1), Action::Sell);
        assert_eq!(Action::from_score(-60.0), Action::Sell);
        assert_eq!(Action::from_score(-60.1), Action::StrongSell);
    }

    #[test]
    fn test_risk_level_from_confidence_and_consensus() {
        let mut rec = Recommendation {
            symbol: "AAPL".to_string(),
            as_of: Utc::now(),
            score: 30.0,
            confidence: 70.0,
            action: Action::Buy,
            consensus: Consensus::Strong,
            outcomes: vec![],
        };
        assert_eq!(rec.risk_level(), RiskLevel::Low);

        rec.consensus = Consensus::Moderate;
        assert_eq!(rec.risk_level(), RiskLevel::Medium);

        rec.consensus = Consensus::Weak;
        assert_eq!(rec.risk_level(), RiskLevel::High);

        rec.consensus = Consensus::Strong;
        rec.confidence = 35.0;
        assert_eq!(rec.risk_level(), RiskLevel::High);
    }
}
