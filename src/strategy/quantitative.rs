use super::{confidence_from_score, Strategy};
use crate::error::StrategyError;
use crate::models::{features, FeatureSnapshot, StrategyId, StrategyOutcome};

// Factor weights. Relative price position carries the most weight; the
// original calibration found it the most persistent of the four.
const WEIGHT_MOMENTUM: f64 = 0.25;
const WEIGHT_VOLATILITY: f64 = 0.20;
const WEIGHT_VOLUME: f64 = 0.20;
const WEIGHT_PRICE_POSITION: f64 = 0.35;

/// Factor-style read: momentum across two horizons, realized volatility
/// against its trailing quartiles, volume confirmation, and how stretched
/// price is versus its long average.
pub struct QuantStrategy;

impl QuantStrategy {
    fn momentum_score(r_short: f64, r_medium: f64, reasons: &mut Vec<String>) -> f64 {
        if r_short > 2.0 && r_medium > 5.0 {
            reasons.push(format!(
                "strong momentum ({r_short:+.1}% short, {r_medium:+.1}% medium)"
            ));
            25.0
        } else if r_short < -2.0 && r_medium < -5.0 {
            reasons.push(format!(
                "sharp decline ({r_short:+.1}% short, {r_medium:+.1}% medium)"
            ));
            -20.0
        } else if r_short > 0.0 && r_medium > 0.0 {
            reasons.push("mild positive momentum".to_string());
            15.0
        } else if r_short < 0.0 && r_medium < 0.0 {
            reasons.push("mild decline on both horizons".to_string());
            -15.0
        } else {
            0.0
        }
    }

    fn volatility_score(vol: f64, p25: f64, p75: f64, reasons: &mut Vec<String>) -> f64 {
        if vol <= p25 {
            reasons.push("volatility in bottom quartile".to_string());
            15.0
        } else if vol >= p75 {
            reasons.push("volatility in top quartile".to_string());
            -10.0
        } else {
            0.0
        }
    }

    fn volume_score(ratio: f64, r_short: f64, reasons: &mut Vec<String>) -> f64 {
        if ratio >= 1.5 && r_short > 0.0 {
            reasons.push(format!("volume surge {ratio:.1}x on strength"));
            20.0
        } else if ratio >= 1.5 && r_short < 0.0 {
            reasons.push(format!("volume surge {ratio:.1}x on weakness"));
            -15.0
        } else if ratio < 0.5 {
            reasons.push("volume drying up".to_string());
            -5.0
        } else {
            0.0
        }
    }

    fn position_score(deviation_pct: f64, reasons: &mut Vec<String>) -> f64 {
        if deviation_pct < -10.0 {
            reasons.push(format!("{:.1}% below long average", deviation_pct.abs()));
            25.0
        } else if deviation_pct > 10.0 {
            reasons.push(format!("{deviation_pct:.1}% stretched above long average"));
            -20.0
        } else if deviation_pct.abs() < 3.0 {
            reasons.push("price hugging long average".to_string());
            10.0
        } else {
            0.0
        }
    }
}

impl Strategy for QuantStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Quantitative
    }

    fn evaluate(&self, snapshot: &FeatureSnapshot) -> Result<StrategyOutcome, StrategyError> {
        let r_short = snapshot.feature(features::RETURNS_SHORT_PCT)?;
        let r_medium = snapshot.feature(features::RETURNS_MEDIUM_PCT)?;
        let vol = snapshot.feature(features::VOLATILITY)?;
        let vol_p25 = snapshot.feature(features::VOLATILITY_P25)?;
        let vol_p75 = snapshot.feature(features::VOLATILITY_P75)?;
        let volume_ratio = snapshot.feature(features::VOLUME_RATIO)?;
        let price = snapshot.feature(features::PRICE)?;
        let sma_long = snapshot.feature(features::SMA_LONG)?;

        if sma_long <= 0.0 {
            return Err(StrategyError::BadValue(
                features::SMA_LONG.to_string(),
                sma_long,
            ));
        }
        let deviation_pct = (price - sma_long) / sma_long * 100.0;

        let mut reasons = Vec::new();
        let score = WEIGHT_MOMENTUM * Self::momentum_score(r_short, r_medium, &mut reasons)
            + WEIGHT_VOLATILITY * Self::volatility_score(vol, vol_p25, vol_p75, &mut reasons)
            + WEIGHT_VOLUME * Self::volume_score(volume_ratio, r_short, &mut reasons)
            + WEIGHT_PRICE_POSITION * Self::position_score(deviation_pct, &mut reasons);

        let confidence = confidence_from_score(score);
        Ok(StrategyOutcome::scored(
            StrategyId::Quantitative,
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

    fn quant_pairs() -> Vec<(&'static str, f64)> {
        vec![
            (features::RETURNS_SHORT_PCT, 0.0),
            (features::RETURNS_MEDIUM_PCT, 0.0),
            (features::VOLATILITY, 0.020),
            (features::VOLATILITY_P25, 0.012),
            (features::VOLATILITY_P75, 0.030),
            (features::VOLUME_RATIO, 1.0),
            (features::PRICE, 105.0),
            (features::SMA_LONG, 100.0),
        ]
    }

    #[test]
    fn test_neutral_snapshot_scores_zero() {
        // deviation +5% sits in the dead zone: outside the +/-3% hug,
        // inside the +/-10% stretch
        let outcome = QuantStrategy.evaluate(&snapshot(&quant_pairs())).unwrap();
        assert_eq!(outcome.score, 0.0);
    }

    #[test]
    fn test_bullish_factor_blend() {
        let mut pairs = quant_pairs();
        for (name, value) in pairs.iter_mut() {
            match *name {
                features::RETURNS_SHORT_PCT => *value = 3.5,
                features::RETURNS_MEDIUM_PCT => *value = 8.0,
                features::VOLATILITY => *value = 0.010,
                features::VOLUME_RATIO => *value = 1.8,
                features::PRICE => *value = 101.0,
                _ => {}
            }
        }
        // momentum +25, low vol +15, surge on strength +20, hugging +10:
        // 0.25*25 + 0.20*15 + 0.20*20 + 0.35*10 = 16.75
        let outcome = QuantStrategy.evaluate(&snapshot(&pairs)).unwrap();
        assert!((outcome.score - 16.75).abs() < 1e-9);
        assert_eq!(outcome.reasons.len(), 4);
    }

    #[test]
    fn test_momentum_tiers() {
        let mut reasons = Vec::new();
        assert_eq!(QuantStrategy::momentum_score(2.1, 5.1, &mut reasons), 25.0);
        assert_eq!(QuantStrategy::momentum_score(1.0, 6.0, &mut reasons), 15.0);
        assert_eq!(
            QuantStrategy::momentum_score(-2.1, -5.1, &mut reasons),
            -20.0
        );
        assert_eq!(
            QuantStrategy::momentum_score(-1.0, -1.0, &mut reasons),
            -15.0
        );
        // mixed horizons cancel out
        assert_eq!(QuantStrategy::momentum_score(1.0, -1.0, &mut reasons), 0.0);
    }

    #[test]
    fn test_volatility_quartiles_inclusive() {
        let mut reasons = Vec::new();
        assert_eq!(
            QuantStrategy::volatility_score(0.012, 0.012, 0.030, &mut reasons),
            15.0
        );
        assert_eq!(
            QuantStrategy::volatility_score(0.030, 0.012, 0.030, &mut reasons),
            -10.0
        );
        assert_eq!(
            QuantStrategy::volatility_score(0.020, 0.012, 0.030, &mut reasons),
            0.0
        );
    }

    #[test]
    fn test_volume_confirmation() {
        let mut reasons = Vec::new();
        assert_eq!(QuantStrategy::volume_score(1.5, 1.0, &mut reasons), 20.0);
        assert_eq!(QuantStrategy::volume_score(2.0, -1.0, &mut reasons), -15.0);
        assert_eq!(QuantStrategy::volume_score(0.4, 1.0, &mut reasons), -5.0);
        assert_eq!(QuantStrategy::volume_score(1.0, 1.0, &mut reasons), 0.0);
        // surge with flat price confirms nothing
        assert_eq!(QuantStrategy::volume_score(2.0, 0.0, &mut reasons), 0.0);
    }

    #[test]
    fn test_position_tiers() {
        let mut reasons = Vec::new();
        assert_eq!(QuantStrategy::position_score(-12.0, &mut reasons), 25.0);
        assert_eq!(QuantStrategy::position_score(12.0, &mut reasons), -20.0);
        assert_eq!(QuantStrategy::position_score(1.5, &mut reasons), 10.0);
        assert_eq!(QuantStrategy::position_score(-2.9, &mut reasons), 10.0);
        assert_eq!(QuantStrategy::position_score(6.0, &mut reasons), 0.0);
    }

    #[test]
    fn test_zero_long_average_is_rejected() {
        let mut pairs = quant_pairs();
        for (name, value) in pairs.iter_mut() {
            if *name == features::SMA_LONG {
                *value = 0.0;
            }
        }
        let err = QuantStrategy.evaluate(&snapshot(&pairs)).unwrap_err();
        assert!(err.to_string().contains("sma_long"));
    }

    #[test]
    fn test_missing_feature_fails_loudly() {
        let mut pairs = quant_pairs();
        pairs.retain(|(name, _)| *name != features::VOLUME_RATIO);
        let err = QuantStrategy.evaluate(&snapshot(&pairs)).unwrap_err();
        assert!(err.to_string().contains("volume_ratio"));
    }
}
