use std::time::Duration;

/// Tuning knobs for a batch run. Everything is explicit; nothing reads
/// global state.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Hard cap on simultaneously running evaluations.
    pub max_concurrency: usize,
    /// Budget for a single attempt (fetch + score). A blown budget counts
    /// as a transient failure.
    pub per_task_timeout: Duration,
    /// Retries after the first attempt, so a task runs at most
    /// `max_retries + 1` times.
    pub max_retries: u32,
    /// First backoff delay; later ones double from here, plus jitter.
    pub backoff_base: Duration,
    /// Upstream fetches per second, shared across all workers.
    pub rate_limit_per_sec: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            per_task_timeout: Duration::from_secs(30),
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            rate_limit_per_sec: 5,
        }
    }
}

impl BatchConfig {
    /// Profile picked from the batch size: small lists stay gentle on the
    /// provider, large ones open up concurrency and the shared rate.
    pub fn optimized_for(symbol_count: usize) -> Self {
        if symbol_count <= 10 {
            Self::default()
        } else if symbol_count <= 50 {
            Self {
                max_concurrency: 8,
                rate_limit_per_sec: 10,
                ..Self::default()
            }
        } else {
            Self {
                max_concurrency: 10,
                per_task_timeout: Duration::from_secs(45),
                rate_limit_per_sec: 20,
                ..Self::default()
            }
        }
    }
}
