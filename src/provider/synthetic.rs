use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::{FeatureProvider, Period};
use crate::error::FetchError;
use crate::models::{features, FeatureSnapshot};

/// Market regimes the synthetic feed can fake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketScenario {
    /// Oversold bounce setup: low RSI, rising averages, momentum behind it
    Bullish,
    /// Rolling over: overbought RSI, falling averages, volume drying up
    Bearish,
    /// Nothing happening, every signal near its dead zone
    Sideways,
    /// Stressed tape: top-quartile volatility, signals disagreeing
    Volatile,
}

impl fmt::Display for MarketScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarketScenario::Bullish => "bullish",
            MarketScenario::Bearish => "bearish",
            MarketScenario::Sideways => "sideways",
            MarketScenario::Volatile => "volatile",
        };
        f.write_str(s)
    }
}

/// Deterministic snapshot source for demos and tests.
///
/// Every (seed, symbol) pair always produces the same snapshot regardless
/// of call order, so concurrent fetches stay reproducible.
pub struct SyntheticFeed {
    scenario: MarketScenario,
    seed: u64,
    base_price: f64,
    base_volume: f64,
}

impl SyntheticFeed {
    pub fn new(scenario: MarketScenario, seed: u64) -> Self {
        Self {
            scenario,
            seed,
            base_price: 150.0,
            base_volume: 1_000_000.0,
        }
    }

    fn rng_for(&self, symbol: &str) -> StdRng {
        let mut hasher = DefaultHasher::new();
        symbol.hash(&mut hasher);
        StdRng::seed_from_u64(self.seed ^ hasher.finish())
    }

    fn snapshot_for(&self, symbol: &str) -> FeatureSnapshot {
        let mut rng = self.rng_for(symbol);
        let price = self.base_price * rng.gen_range(0.95..1.05);

        let mut f = HashMap::new();
        match self.scenario {
            MarketScenario::Bullish => {
                let macd = rng.gen_range(1.5..2.5);
                let change_pct = rng.gen_range(1.0..3.0);
                f.insert(features::RSI.to_string(), rng.gen_range(24.0..30.0));
                f.insert(features::MACD.to_string(), macd);
                f.insert(features::MACD_SIGNAL.to_string(), macd * 0.5);
                f.insert(features::MACD_HIST.to_string(), macd * 0.5);
                f.insert(features::SMA_SHORT.to_string(), price * 0.97);
                f.insert(features::SMA_LONG.to_string(), price * 0.94);
                // selloff inside an uptrend: price still under the band
                f.insert(features::BB_LOWER.to_string(), price * 1.01);
                f.insert(features::BB_UPPER.to_string(), price * 1.18);
                f.insert(features::PRICE_CHANGE_PCT.to_string(), change_pct);
                f.insert(
                    features::RETURNS_SHORT_PCT.to_string(),
                    rng.gen_range(2.5..4.5),
                );
                f.insert(
                    features::RETURNS_MEDIUM_PCT.to_string(),
                    rng.gen_range(6.0..9.0),
                );
                f.insert(features::VOLATILITY.to_string(), 0.010);
                f.insert(features::VOLUME_RATIO.to_string(), rng.gen_range(1.6..2.0));
            }
            MarketScenario::Bearish => {
                let macd = rng.gen_range(-2.5..-1.5);
                let change_pct = rng.gen_range(-3.0..-1.0);
                f.insert(features::RSI.to_string(), rng.gen_range(71.0..79.0));
                f.insert(features::MACD.to_string(), macd);
                f.insert(features::MACD_SIGNAL.to_string(), macd * 0.5);
                f.insert(features::MACD_HIST.to_string(), macd * 0.5);
                f.insert(features::SMA_SHORT.to_string(), price * 1.03);
                f.insert(features::SMA_LONG.to_string(), price * 1.06);
                f.insert(features::BB_LOWER.to_string(), price * 0.85);
                f.insert(features::BB_UPPER.to_string(), price * 0.99);
                f.insert(features::PRICE_CHANGE_PCT.to_string(), change_pct);
                f.insert(
                    features::RETURNS_SHORT_PCT.to_string(),
                    rng.gen_range(-4.5..-2.5),
                );
                f.insert(
                    features::RETURNS_MEDIUM_PCT.to_string(),
                    rng.gen_range(-9.0..-6.0),
                );
                f.insert(features::VOLATILITY.to_string(), 0.035);
                f.insert(features::VOLUME_RATIO.to_string(), rng.gen_range(0.3..0.45));
            }
            MarketScenario::Sideways => {
                let macd = rng.gen_range(-0.1..0.1);
                let change_pct = rng.gen_range(-0.5..0.5);
                f.insert(features::RSI.to_string(), rng.gen_range(45.0..55.0));
                f.insert(features::MACD.to_string(), macd);
                f.insert(features::MACD_SIGNAL.to_string(), macd);
                f.insert(features::MACD_HIST.to_string(), 0.0);
                f.insert(features::SMA_SHORT.to_string(), price * 1.01);
                f.insert(features::SMA_LONG.to_string(), price * 0.99);
                f.insert(features::BB_LOWER.to_string(), price * 0.93);
                f.insert(features::BB_UPPER.to_string(), price * 1.07);
                f.insert(features::PRICE_CHANGE_PCT.to_string(), change_pct);
                f.insert(
                    features::RETURNS_SHORT_PCT.to_string(),
                    rng.gen_range(-0.8..0.8),
                );
                f.insert(
                    features::RETURNS_MEDIUM_PCT.to_string(),
                    rng.gen_range(-1.5..1.5),
                );
                f.insert(features::VOLATILITY.to_string(), 0.021);
                f.insert(features::VOLUME_RATIO.to_string(), rng.gen_range(0.8..1.2));
            }
            MarketScenario::Volatile => {
                let macd = rng.gen_range(-1.0..1.0);
                let change_pct = rng.gen_range(-4.0..4.0);
                f.insert(features::RSI.to_string(), rng.gen_range(35.0..65.0));
                f.insert(features::MACD.to_string(), macd);
                f.insert(features::MACD_SIGNAL.to_string(), 0.0);
                f.insert(features::MACD_HIST.to_string(), macd);
                f.insert(features::SMA_SHORT.to_string(), price * rng.gen_range(0.96..1.04));
                f.insert(features::SMA_LONG.to_string(), price * rng.gen_range(0.94..1.06));
                f.insert(features::BB_LOWER.to_string(), price * 0.80);
                f.insert(features::BB_UPPER.to_string(), price * 1.20);
                f.insert(features::PRICE_CHANGE_PCT.to_string(), change_pct);
                f.insert(
                    features::RETURNS_SHORT_PCT.to_string(),
                    rng.gen_range(-6.0..6.0),
                );
                f.insert(
                    features::RETURNS_MEDIUM_PCT.to_string(),
                    rng.gen_range(-3.0..3.0),
                );
                f.insert(features::VOLATILITY.to_string(), 0.045);
                f.insert(features::VOLUME_RATIO.to_string(), rng.gen_range(1.5..2.5));
            }
        }

        // common plumbing features
        let change_pct = f[features::PRICE_CHANGE_PCT];
        let ratio = f[features::VOLUME_RATIO];
        f.insert(features::PRICE.to_string(), price);
        f.insert(
            features::PREV_CLOSE.to_string(),
            price / (1.0 + change_pct / 100.0),
        );
        f.insert(features::AVG_VOLUME.to_string(), self.base_volume);
        f.insert(features::VOLUME.to_string(), self.base_volume * ratio);
        f.insert(features::VOLATILITY_P25.to_string(), 0.012);
        f.insert(features::VOLATILITY_P75.to_string(), 0.030);

        FeatureSnapshot::new(symbol, Utc::now(), f)
    }
}

#[async_trait]
impl FeatureProvider for SyntheticFeed {
    async fn fetch(&self, symbol: &str, _period: Period) -> Result<FeatureSnapshot, FetchError> {
        Ok(self.snapshot_for(symbol))
    }
}
