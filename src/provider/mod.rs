// Feature snapshot sources
pub mod feature_api;
pub mod synthetic;

pub use feature_api::FeatureApiClient;
pub use synthetic::{MarketScenario, SyntheticFeed};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FetchError;
use crate::models::FeatureSnapshot;

/// Lookback window requested from the feature service.
///
/// Serialized forms match the query-string values (`1mo`, `1y`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1mo" => Ok(Period::OneMonth),
            "3mo" => Ok(Period::ThreeMonths),
            "6mo" => Ok(Period::SixMonths),
            "1y" => Ok(Period::OneYear),
            "2y" => Ok(Period::TwoYears),
            other => Err(format!("unknown period `{other}` (use 1mo|3mo|6mo|1y|2y)")),
        }
    }
}

/// Upstream source of precomputed feature snapshots.
///
/// Implementations classify failures so the batch layer can decide whether
/// a retry makes sense: `NotFound` is final, `Throttled` and `Transient`
/// are not.
#[async_trait]
pub trait FeatureProvider: Send + Sync {
    async fn fetch(&self, symbol: &str, period: Period) -> Result<FeatureSnapshot, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_round_trip() {
        for period in [
            Period::OneMonth,
            Period::ThreeMonths,
            Period::SixMonths,
            Period::OneYear,
            Period::TwoYears,
        ] {
            assert_eq!(period.as_str().parse::<Period>().unwrap(), period);
        }
    }

    #[test]
    fn test_unknown_period_is_rejected() {
        let err = "5y".parse::<Period>().unwrap_err();
        assert!(err.contains("5y"));
    }

    #[test]
    fn test_default_period_is_one_year() {
        assert_eq!(Period::default(), Period::OneYear);
    }
}
