// Concurrent batch evaluation
pub mod config;
pub mod orchestrator;
pub mod progress;
pub mod report;
pub mod task;

pub use config::BatchConfig;
pub use orchestrator::run_batch;
pub use progress::{LogSink, NullSink, ProgressSink, ProgressSnapshot};
pub use report::{BatchReport, SymbolOutcome, SymbolReport};
pub use task::{BatchTask, TaskState};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::consensus::StrategyWeights;
use crate::models::StrategyId;
use crate::provider::Period;

/// Cooperative cancellation handle shared between the caller and workers.
///
/// Once tripped it never resets. Undispatched tasks observe it before they
/// start; running tasks check it at their suspension points.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything one batch run evaluates, besides the tuning knobs.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub symbols: Vec<String>,
    pub strategies: Vec<StrategyId>,
    pub weights: StrategyWeights,
    pub period: Period,
}

impl BatchRequest {
    /// Request with all strategies, default weights and period.
    pub fn new(symbols: Vec<String>) -> Self {
        Self {
            symbols,
            strategies: StrategyId::ALL.to_vec(),
            weights: StrategyWeights::default(),
            period: Period::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());
        flag.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_default_request_selects_all_strategies() {
        let request = BatchRequest::new(vec!["AAPL".to_string()]);
        assert_eq!(request.strategies.len(), 3);
        assert_eq!(request.period, Period::OneYear);
    }
}
