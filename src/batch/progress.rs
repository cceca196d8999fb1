use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Point-in-time view of a running batch. The five buckets always sum to
/// `submitted`.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    pub submitted: usize,
    pub pending: usize,
    pub in_flight: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed + self.cancelled
    }

    pub fn completion_rate(&self) -> f64 {
        if self.submitted == 0 {
            return 100.0;
        }
        self.completed() as f64 / self.submitted as f64 * 100.0
    }

    pub fn success_rate(&self) -> f64 {
        let completed = self.completed();
        if completed == 0 {
            return 0.0;
        }
        self.succeeded as f64 / completed as f64 * 100.0
    }

    /// Linear extrapolation from the average completion time so far.
    pub fn estimated_remaining(&self) -> Option<Duration> {
        let completed = self.completed();
        if completed == 0 || self.submitted <= completed {
            return None;
        }
        let per_task = self.elapsed.div_f64(completed as f64);
        Some(per_task.mul_f64((self.submitted - completed) as f64))
    }
}

/// Observer for batch progress.
///
/// The orchestrator calls this inline after every task transition, so
/// implementations must return quickly and never block.
pub trait ProgressSink: Send + Sync {
    fn update(&self, snapshot: &ProgressSnapshot);
}

/// Discards every update.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn update(&self, _snapshot: &ProgressSnapshot) {}
}

/// Logs each transition at info level.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn update(&self, snapshot: &ProgressSnapshot) {
        tracing::info!(
            "📊 progress {}/{} ({} ok, {} failed, {} cancelled, {} in flight)",
            snapshot.completed(),
            snapshot.submitted,
            snapshot.succeeded,
            snapshot.failed,
            snapshot.cancelled,
            snapshot.in_flight
        );
    }
}

/// Shared transition counters for one batch run.
///
/// Workers mutate these atomically; `snapshot` assembles a consistent view
/// for the sink.
pub(crate) struct ProgressLedger {
    submitted: usize,
    started_at: Instant,
    pending: AtomicUsize,
    in_flight: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    cancelled: AtomicUsize,
}

impl ProgressLedger {
    pub fn new(submitted: usize) -> Self {
        Self {
            submitted,
            started_at: Instant::now(),
            pending: AtomicUsize::new(submitted),
            in_flight: AtomicUsize::new(0),
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            cancelled: AtomicUsize::new(0),
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            submitted: self.submitted,
            pending: self.pending.load(Ordering::SeqCst),
            in_flight: self.in_flight.load(Ordering::SeqCst),
            succeeded: self.succeeded.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            cancelled: self.cancelled.load(Ordering::SeqCst),
            elapsed: self.started_at.elapsed(),
        }
    }

    pub fn task_dispatched(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    pub fn task_succeeded(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.succeeded.fetch_add(1, Ordering::SeqCst);
    }

    pub fn task_failed(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn task_cancelled_pending(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
        self.cancelled.fetch_add(1, Ordering::SeqCst);
    }

    pub fn task_cancelled_in_flight(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.cancelled.fetch_add(1, Ordering::SeqCst);
    }
}
