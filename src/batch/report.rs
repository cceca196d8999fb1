use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use crate::models::Recommendation;

/// Terminal result for one symbol.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SymbolOutcome {
    Succeeded {
        recommendation: Recommendation,
    },
    Failed {
        reason: String,
        /// True when retrying could never have helped (unknown symbol,
        /// nothing to aggregate).
        permanent: bool,
    },
    Cancelled,
}

/// One entry of a batch report.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolReport {
    pub symbol: String,
    pub outcome: SymbolOutcome,
    pub attempts: u32,
    pub duration: Duration,
}

impl SymbolReport {
    pub fn recommendation(&self) -> Option<&Recommendation> {
        match &self.outcome {
            SymbolOutcome::Succeeded { recommendation } => Some(recommendation),
            _ => None,
        }
    }
}

/// Immutable record of a finished batch run.
///
/// `entries` preserves input order regardless of completion order, and
/// every submitted symbol appears exactly once.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub elapsed: Duration,
    pub entries: Vec<SymbolReport>,
}

impl BatchReport {
    /// Derives the counters from the entries so they can never disagree.
    pub(crate) fn assemble(batch_id: Uuid, entries: Vec<SymbolReport>, elapsed: Duration) -> Self {
        let mut succeeded = 0;
        let mut failed = 0;
        let mut cancelled = 0;
        for entry in &entries {
            match entry.outcome {
                SymbolOutcome::Succeeded { .. } => succeeded += 1,
                SymbolOutcome::Failed { .. } => failed += 1,
                SymbolOutcome::Cancelled => cancelled += 1,
            }
        }
        Self {
            batch_id,
            submitted: entries.len(),
            succeeded,
            failed,
            cancelled,
            elapsed,
            entries,
        }
    }

    pub fn recommendations(&self) -> impl Iterator<Item = &Recommendation> {
        self.entries.iter().filter_map(|e| e.recommendation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, Consensus};
    use chrono::Utc;

    fn entry(symbol: &str, outcome: SymbolOutcome) -> SymbolReport {
        SymbolReport {
            symbol: symbol.to_string(),
            outcome,
            attempts: 1,
            duration: Duration::from_millis(5),
        }
    }

    fn rec(symbol: &str) -> Recommendation {
        Recommendation {
            symbol: symbol.to_string(),
            as_of: Utc::now(),
            score: 30.0,
            confidence: 55.0,
            action: Action::Buy,
            consensus: Consensus::Strong,
            outcomes: vec![],
        }
    }

    #[test]
    fn test_counters_derive_from_entries() {
        let entries = vec![
            entry(
                "AAPL",
                SymbolOutcome::Succeeded {
                    recommendation: rec("AAPL"),
                },
            ),
            entry(
                "FAKE",
                SymbolOutcome::Failed {
                    reason: "symbol not found or delisted".to_string(),
                    permanent: true,
                },
            ),
            entry("MSFT", SymbolOutcome::Cancelled),
        ];
        let report = BatchReport::assemble(Uuid::new_v4(), entries, Duration::from_secs(2));

        assert_eq!(report.submitted, 3);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.cancelled, 1);
        assert_eq!(report.recommendations().count(), 1);
    }

    #[test]
    fn test_report_serializes_with_tagged_outcomes() {
        let entries = vec![entry("MSFT", SymbolOutcome::Cancelled)];
        let report = BatchReport::assemble(Uuid::new_v4(), entries, Duration::from_secs(1));
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"status\":\"cancelled\""));
    }
}
