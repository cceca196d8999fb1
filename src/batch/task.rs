use serde::Serialize;
use std::time::Duration;

use crate::models::StrategyId;

/// Lifecycle of one symbol inside a batch run.
///
/// `Pending -> InFlight -> {Succeeded | Failed}`, with `InFlight ->
/// Retrying -> InFlight` loops in between. `Cancelled` is reachable from
/// `Pending` (never dispatched) and from the retry path (abandoned at a
/// suspension point).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    InFlight,
    Retrying,
    Succeeded,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Cancelled
        )
    }
}

/// One unit of batch work with its retry bookkeeping.
///
/// The worker drives this through explicit transitions so every state
/// change has a single place to hang progress updates off.
#[derive(Debug, Clone)]
pub struct BatchTask {
    pub symbol: String,
    pub strategies: Vec<StrategyId>,
    /// Per-attempt budget.
    pub timeout: Duration,
    /// Attempts performed so far (dispatches, not retries).
    pub attempts: u32,
    pub state: TaskState,
}

impl BatchTask {
    pub fn new(symbol: impl Into<String>, strategies: Vec<StrategyId>, timeout: Duration) -> Self {
        Self {
            symbol: symbol.into(),
            strategies,
            timeout,
            attempts: 0,
            state: TaskState::Pending,
        }
    }

    /// Pending/Retrying -> InFlight. Each dispatch is one attempt.
    pub fn dispatch(&mut self) {
        debug_assert!(
            matches!(self.state, TaskState::Pending | TaskState::Retrying),
            "dispatch from {:?}",
            self.state
        );
        self.state = TaskState::InFlight;
        self.attempts += 1;
    }

    /// InFlight -> Retrying, after a retryable failure.
    pub fn mark_retrying(&mut self) {
        debug_assert_eq!(self.state, TaskState::InFlight);
        self.state = TaskState::Retrying;
    }

    pub fn succeed(&mut self) {
        debug_assert_eq!(self.state, TaskState::InFlight);
        self.state = TaskState::Succeeded;
    }

    pub fn fail(&mut self) {
        debug_assert_eq!(self.state, TaskState::InFlight);
        self.state = TaskState::Failed;
    }

    pub fn cancel(&mut self) {
        debug_assert!(!self.state.is_terminal(), "cancel from {:?}", self.state);
        self.state = TaskState::Cancelled;
    }
}
