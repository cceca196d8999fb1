use super::Strategy;
use crate::error::StrategyError;
use crate::models::{features, FeatureSnapshot, StrategyId, StrategyOutcome};

/// Predictions are clipped here before scaling to a score, so the model can
/// never claim more than +/-80 on its own.
const PREDICTION_CLIP: f64 = 0.8;

/// Votes below this magnitude are not worth a reason line.
const SALIENT_VOTE: f64 = 0.3;

/// Linear blend weights fitted offline. They sum to 1, so the raw
/// prediction lives in [-1, 1] before clipping.
struct VoteWeights {
    rsi: f64,
    trend: f64,
    day_change: f64,
    volume: f64,
    volatility: f64,
    short_momentum: f64,
    medium_momentum: f64,
}

const TRAINED: VoteWeights = VoteWeights {
    rsi: 0.25,
    trend: 0.25,
    day_change: 0.10,
    volume: 0.05,
    volatility: 0.10,
    short_momentum: 0.15,
    medium_momentum: 0.10,
};

/// Fixed-weight scoring model over a seven-feature vector.
///
/// Each feature casts a squashed vote in [-1, 1]; the weighted blend is the
/// prediction. Confidence comes from how much the votes agree with each
/// other (weighted dispersion), not from the score's magnitude.
pub struct ModelStrategy {
    weights: VoteWeights,
}

impl ModelStrategy {
    pub fn new() -> Self {
        Self { weights: TRAINED }
    }

    /// Feature votes in model order. Keep in sync with [`VoteWeights`].
    fn votes(snapshot: &FeatureSnapshot) -> Result<[(f64, &'static str); 7], StrategyError> {
        let rsi = snapshot.feature(features::RSI)?;
        let macd_hist = snapshot.feature(features::MACD_HIST)?;
        let day_change = snapshot.feature(features::PRICE_CHANGE_PCT)?;
        let volume_ratio = snapshot.feature(features::VOLUME_RATIO)?;
        let vol = snapshot.feature(features::VOLATILITY)?;
        let vol_p25 = snapshot.feature(features::VOLATILITY_P25)?;
        let vol_p75 = snapshot.feature(features::VOLATILITY_P75)?;
        let r_short = snapshot.feature(features::RETURNS_SHORT_PCT)?;
        let r_medium = snapshot.feature(features::RETURNS_MEDIUM_PCT)?;

        if vol_p75 <= vol_p25 {
            return Err(StrategyError::BadValue(
                features::VOLATILITY_P75.to_string(),
                vol_p75,
            ));
        }
        let vol_mid = (vol_p25 + vol_p75) / 2.0;
        let vol_halfspan = (vol_p75 - vol_p25) / 2.0;

        Ok([
            (((50.0 - rsi) / 50.0).clamp(-1.0, 1.0), "oversold"),
            (macd_hist.tanh(), "trend"),
            ((day_change / 5.0).tanh(), "day change"),
            ((volume_ratio - 1.0).tanh(), "volume"),
            // calm tape votes positive, stressed tape negative
            ((-(vol - vol_mid) / vol_halfspan).clamp(-1.0, 1.0), "volatility"),
            ((r_short / 10.0).tanh(), "short momentum"),
            ((r_medium / 20.0).tanh(), "medium momentum"),
        ])
    }

    fn weight_vector(&self) -> [f64; 7] {
        [
            self.weights.rsi,
            self.weights.trend,
            self.weights.day_change,
            self.weights.volume,
            self.weights.volatility,
            self.weights.short_momentum,
            self.weights.medium_momentum,
        ]
    }
}

impl Default for ModelStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for ModelStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Model
    }

    fn evaluate(&self, snapshot: &FeatureSnapshot) -> Result<StrategyOutcome, StrategyError> {
        let votes = Self::votes(snapshot)?;
        let weights = self.weight_vector();

        let raw: f64 = votes
            .iter()
            .zip(weights.iter())
            .map(|((vote, _), w)| vote * w)
            .sum();
        let prediction = raw.clamp(-PREDICTION_CLIP, PREDICTION_CLIP);
        let score = prediction * 100.0;

        // Weighted dispersion of votes around the raw blend. Unanimous
        // votes give sigma 0; a hard split toward +/-1 pushes it past 1.
        let variance: f64 = votes
            .iter()
            .zip(weights.iter())
            .map(|((vote, _), w)| w * (vote - raw).powi(2))
            .sum();
        let sigma = variance.sqrt();
        let confidence = ((1.0 - sigma) * 100.0).clamp(5.0, 90.0);

        let mut reasons: Vec<String> = votes
            .iter()
            .filter(|(vote, _)| vote.abs() >= SALIENT_VOTE)
            .map(|(vote, name)| format!("{name} vote {vote:+.2}"))
            .collect();
        reasons.push(format!("model prediction {prediction:+.2}"));

        Ok(StrategyOutcome::scored(
            StrategyId::Model,
            score,
            confidence,
            reasons,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn snapshot(pairs: &[(&str, f64)]) -> FeatureSnapshot {
        let features = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect::<HashMap<_, _>>();
        FeatureSnapshot::new("TEST", Utc::now(), features)
    }

    fn model_pairs() -> Vec<(&'static str, f64)> {
        vec![
            (features::RSI, 50.0),
            (features::MACD_HIST, 0.0),
            (features::PRICE_CHANGE_PCT, 0.0),
            (features::VOLUME_RATIO, 1.0),
            (features::VOLATILITY, 0.021),
            (features::VOLATILITY_P25, 0.012),
            (features::VOLATILITY_P75, 0.030),
            (features::RETURNS_SHORT_PCT, 0.0),
            (features::RETURNS_MEDIUM_PCT, 0.0),
        ]
    }

    fn set(pairs: &mut Vec<(&'static str, f64)>, name: &str, value: f64) {
        for (n, v) in pairs.iter_mut() {
            if *n == name {
                *v = value;
            }
        }
    }

    #[test]
    fn test_flat_tape_is_near_zero_with_high_confidence() {
        let outcome = ModelStrategy::new()
            .evaluate(&snapshot(&model_pairs()))
            .unwrap();
        assert!(outcome.score.abs() < 1.0, "score {}", outcome.score);
        // all votes agree on "nothing happening"
        assert!(outcome.confidence > 85.0, "confidence {}", outcome.confidence);
    }

    #[test]
    fn test_uniformly_bullish_votes_score_positive() {
        let mut pairs = model_pairs();
        set(&mut pairs, features::RSI, 25.0);
        set(&mut pairs, features::MACD_HIST, 1.0);
        set(&mut pairs, features::PRICE_CHANGE_PCT, 2.5);
        set(&mut pairs, features::VOLUME_RATIO, 1.8);
        set(&mut pairs, features::VOLATILITY, 0.010);
        set(&mut pairs, features::RETURNS_SHORT_PCT, 3.5);
        set(&mut pairs, features::RETURNS_MEDIUM_PCT, 8.0);

        let outcome = ModelStrategy::new().evaluate(&snapshot(&pairs)).unwrap();
        assert!(outcome.score > 30.0, "score {}", outcome.score);
        assert!(outcome.score <= 80.0);
        assert!(outcome.confidence > 50.0);
        assert!(!outcome.reasons.is_empty());
    }

    #[test]
    fn test_prediction_clips_at_eighty() {
        let mut pairs = model_pairs();
        set(&mut pairs, features::RSI, 1.0);
        set(&mut pairs, features::MACD_HIST, 10.0);
        set(&mut pairs, features::PRICE_CHANGE_PCT, 50.0);
        set(&mut pairs, features::VOLUME_RATIO, 10.0);
        set(&mut pairs, features::VOLATILITY, 0.001);
        set(&mut pairs, features::RETURNS_SHORT_PCT, 50.0);
        set(&mut pairs, features::RETURNS_MEDIUM_PCT, 100.0);

        let outcome = ModelStrategy::new().evaluate(&snapshot(&pairs)).unwrap();
        assert!((outcome.score - 80.0).abs() < 1e-6, "score {}", outcome.score);
    }

    #[test]
    fn test_disagreeing_votes_cut_confidence() {
        // strong bullish momentum against strong bearish trend and RSI
        let mut pairs = model_pairs();
        set(&mut pairs, features::RSI, 95.0);
        set(&mut pairs, features::MACD_HIST, -10.0);
        set(&mut pairs, features::RETURNS_SHORT_PCT, 50.0);
        set(&mut pairs, features::RETURNS_MEDIUM_PCT, 100.0);
        set(&mut pairs, features::PRICE_CHANGE_PCT, 40.0);

        let split = ModelStrategy::new().evaluate(&snapshot(&pairs)).unwrap();
        let flat = ModelStrategy::new()
            .evaluate(&snapshot(&model_pairs()))
            .unwrap();
        assert!(
            split.confidence < flat.confidence,
            "split {} vs flat {}",
            split.confidence,
            flat.confidence
        );
    }

    #[test]
    fn test_degenerate_quartiles_are_rejected() {
        let mut pairs = model_pairs();
        set(&mut pairs, features::VOLATILITY_P75, 0.012);
        let err = ModelStrategy::new()
            .evaluate(&snapshot(&pairs))
            .unwrap_err();
        assert!(err.to_string().contains("volatility_p75"));
    }

    #[test]
    fn test_missing_feature_fails_loudly() {
        let mut pairs = model_pairs();
        pairs.retain(|(name, _)| *name != features::MACD_HIST);
        let err = ModelStrategy::new()
            .evaluate(&snapshot(&pairs))
            .unwrap_err();
        assert!(err.to_string().contains("macd_hist"));
    }
}
