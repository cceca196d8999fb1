use super::{confidence_from_score, Strategy};
use crate::error::StrategyError;
use crate::models::{features, FeatureSnapshot, StrategyId, StrategyOutcome};

// Signal-group weights. Each group scores within roughly +/-30, so the
// weighted sum stays well inside the +/-100 bounds.
const WEIGHT_RSI: f64 = 0.30;
const WEIGHT_TREND: f64 = 0.25;
const WEIGHT_MA_CROSS: f64 = 0.25;
const WEIGHT_BANDS: f64 = 0.20;

/// Classic technical read: RSI extremes, MACD-style trend, moving-average
/// ordering and band position.
///
/// Each signal group produces a sub-score which is blended by fixed weight;
/// a neutral group contributes zero rather than dragging the blend down.
pub struct TechnicalStrategy;

impl TechnicalStrategy {
    fn rsi_score(rsi: f64, reasons: &mut Vec<String>) -> f64 {
        if rsi < 30.0 {
            reasons.push(format!("RSI {rsi:.1} oversold"));
            30.0
        } else if rsi < 40.0 {
            reasons.push(format!("RSI {rsi:.1} approaching oversold"));
            15.0
        } else if rsi > 70.0 {
            reasons.push(format!("RSI {rsi:.1} overbought"));
            -25.0
        } else if rsi > 60.0 {
            reasons.push(format!("RSI {rsi:.1} approaching overbought"));
            -10.0
        } else {
            0.0
        }
    }

    fn trend_score(macd: f64, macd_signal: f64, reasons: &mut Vec<String>) -> f64 {
        if macd > macd_signal {
            if macd > 0.0 {
                reasons.push("MACD bullish above zero".to_string());
                25.0
            } else {
                reasons.push("MACD bullish below zero".to_string());
                15.0
            }
        } else if macd < macd_signal {
            if macd < 0.0 {
                reasons.push("MACD bearish below zero".to_string());
                -20.0
            } else {
                reasons.push("MACD bearish above zero".to_string());
                -10.0
            }
        } else {
            0.0
        }
    }

    fn ma_cross_score(price: f64, sma_short: f64, sma_long: f64, reasons: &mut Vec<String>) -> f64 {
        if price > sma_short && sma_short > sma_long {
            reasons.push("price above rising average stack".to_string());
            20.0
        } else if price < sma_short && sma_short < sma_long {
            reasons.push("price below falling average stack".to_string());
            -20.0
        } else {
            0.0
        }
    }

    fn band_score(price: f64, bb_upper: f64, bb_lower: f64, reasons: &mut Vec<String>) -> f64 {
        let midpoint = (bb_upper + bb_lower) / 2.0;
        if price < bb_lower {
            reasons.push("price below lower band".to_string());
            20.0
        } else if price > bb_upper {
            reasons.push("price above upper band".to_string());
            -15.0
        } else if price > midpoint {
            5.0
        } else {
            0.0
        }
    }
}

impl Strategy for TechnicalStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Technical
    }

    fn evaluate(&self, snapshot: &FeatureSnapshot) -> Result<StrategyOutcome, StrategyError> {
        let rsi = snapshot.feature(features::RSI)?;
        let macd = snapshot.feature(features::MACD)?;
        let macd_signal = snapshot.feature(features::MACD_SIGNAL)?;
        let price = snapshot.feature(features::PRICE)?;
        let sma_short = snapshot.feature(features::SMA_SHORT)?;
        let sma_long = snapshot.feature(features::SMA_LONG)?;
        let bb_upper = snapshot.feature(features::BB_UPPER)?;
        let bb_lower = snapshot.feature(features::BB_LOWER)?;

        let mut reasons = Vec::new();
        let score = WEIGHT_RSI * Self::rsi_score(rsi, &mut reasons)
            + WEIGHT_TREND * Self::trend_score(macd, macd_signal, &mut reasons)
            + WEIGHT_MA_CROSS * Self::ma_cross_score(price, sma_short, sma_long, &mut reasons)
            + WEIGHT_BANDS * Self::band_score(price, bb_upper, bb_lower, &mut reasons);

        let confidence = confidence_from_score(score);
        Ok(StrategyOutcome::scored(
            StrategyId::Technical,
            score,
            confidence,
            reasons,
        ))
    }
}
