use governor::{Quota, RateLimiter};
use rand::Rng;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use uuid::Uuid;

use super::config::BatchConfig;
use super::progress::{ProgressLedger, ProgressSink};
use super::report::{BatchReport, SymbolOutcome, SymbolReport};
use super::task::BatchTask;
use super::{BatchRequest, CancelFlag};
use crate::consensus::StrategyWeights;
use crate::engine::RecommendationEngine;
use crate::error::{EngineError, FetchError};
use crate::provider::Period;

// Type alias for the rate limiter to simplify signatures
type BatchRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Evaluates every symbol in the request concurrently and returns a report
/// with one entry per symbol, in input order.
///
/// Concurrency is capped by a semaphore, dispatch rate by a shared limiter.
/// Individual failures never abort the batch; `cancel` stops it cooperatively.
pub async fn run_batch(
    engine: Arc<RecommendationEngine>,
    request: BatchRequest,
    config: BatchConfig,
    sink: Arc<dyn ProgressSink>,
    cancel: CancelFlag,
) -> BatchReport {
    let batch_id = Uuid::new_v4();
    let started = Instant::now();
    tracing::info!(
        "🚀 Batch {} starting: {} symbols, concurrency {}, {} req/s",
        batch_id,
        request.symbols.len(),
        config.max_concurrency,
        config.rate_limit_per_sec
    );

    let ledger = Arc::new(ProgressLedger::new(request.symbols.len()));
    sink.update(&ledger.snapshot());

    let semaphore = Arc::new(Semaphore::new(config.max_concurrency));
    let per_sec = NonZeroU32::new(config.rate_limit_per_sec.max(1)).unwrap_or(NonZeroU32::MIN);
    let limiter: Arc<BatchRateLimiter> = Arc::new(RateLimiter::direct(Quota::per_second(per_sec)));

    let mut handles = Vec::with_capacity(request.symbols.len());
    for (index, symbol) in request.symbols.iter().enumerate() {
        let handle = {
            let engine = engine.clone();
            let task = BatchTask::new(
                symbol.clone(),
                request.strategies.clone(),
                config.per_task_timeout,
            );
            let weights = request.weights;
            let period = request.period;
            let config = config.clone();
            let semaphore = semaphore.clone();
            let limiter = limiter.clone();
            let ledger = ledger.clone();
            let sink = sink.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                run_task(
                    engine, task, weights, period, config, semaphore, limiter, ledger, sink,
                    cancel,
                )
                .await
            })
        };
        handles.push((index, handle));
    }

    // Completion order is arbitrary; slots keep the report in input order.
    let mut slots: Vec<Option<SymbolReport>> = request.symbols.iter().map(|_| None).collect();
    for (index, handle) in handles {
        match handle.await {
            Ok(entry) => slots[index] = Some(entry),
            Err(err) => {
                tracing::error!("Worker for {} panicked: {}", request.symbols[index], err);
                slots[index] = Some(SymbolReport {
                    symbol: request.symbols[index].clone(),
                    outcome: SymbolOutcome::Failed {
                        reason: "internal worker error".to_string(),
                        permanent: true,
                    },
                    attempts: 0,
                    duration: Duration::ZERO,
                });
            }
        }
    }
    let entries: Vec<SymbolReport> = slots.into_iter().flatten().collect();

    let report = BatchReport::assemble(batch_id, entries, started.elapsed());
    tracing::info!(
        "✓ Batch {} finished in {:.1}s: {} succeeded, {} failed, {} cancelled",
        report.batch_id,
        report.elapsed.as_secs_f64(),
        report.succeeded,
        report.failed,
        report.cancelled
    );
    report
}

/// Drives one task through its state machine until a terminal state.
#[allow(clippy::too_many_arguments)]
async fn run_task(
    engine: Arc<RecommendationEngine>,
    mut task: BatchTask,
    weights: StrategyWeights,
    period: Period,
    config: BatchConfig,
    semaphore: Arc<Semaphore>,
    limiter: Arc<BatchRateLimiter>,
    ledger: Arc<ProgressLedger>,
    sink: Arc<dyn ProgressSink>,
    cancel: CancelFlag,
) -> SymbolReport {
    let started = Instant::now();

    // The semaphore only closes if the runtime tears down mid-batch.
    let Ok(_permit) = semaphore.acquire_owned().await else {
        task.cancel();
        ledger.task_cancelled_pending();
        sink.update(&ledger.snapshot());
        return cancelled_entry(task, started);
    };

    if cancel.is_cancelled() {
        task.cancel();
        ledger.task_cancelled_pending();
        sink.update(&ledger.snapshot());
        return cancelled_entry(task, started);
    }

    loop {
        let first_attempt = task.attempts == 0;
        task.dispatch();
        if first_attempt {
            ledger.task_dispatched();
        }
        sink.update(&ledger.snapshot());

        limiter.until_ready().await;
        if cancel.is_cancelled() {
            task.cancel();
            ledger.task_cancelled_in_flight();
            sink.update(&ledger.snapshot());
            return cancelled_entry(task, started);
        }

        let attempt = tokio::time::timeout(
            task.timeout,
            engine.evaluate_one(&task.symbol, &task.strategies, &weights, period),
        )
        .await
        .unwrap_or_else(|_| {
            Err(EngineError::Fetch(FetchError::Transient(format!(
                "attempt timed out after {:.0?}",
                task.timeout
            ))))
        });

        match attempt {
            Ok(recommendation) => {
                task.succeed();
                ledger.task_succeeded();
                sink.update(&ledger.snapshot());
                tracing::debug!(
                    "✓ {} scored {:+.1} on attempt {}",
                    task.symbol,
                    recommendation.score,
                    task.attempts
                );
                return SymbolReport {
                    symbol: task.symbol,
                    outcome: SymbolOutcome::Succeeded { recommendation },
                    attempts: task.attempts,
                    duration: started.elapsed(),
                };
            }
            Err(err) if err.is_retryable() && task.attempts <= config.max_retries => {
                let delay = backoff_delay(config.backoff_base, task.attempts);
                tracing::warn!(
                    "⚠️ {} attempt {} failed ({}), retrying in {:.1}s",
                    task.symbol,
                    task.attempts,
                    err,
                    delay.as_secs_f64()
                );
                task.mark_retrying();
                sink.update(&ledger.snapshot());
                tokio::time::sleep(delay).await;
                if cancel.is_cancelled() {
                    task.cancel();
                    ledger.task_cancelled_in_flight();
                    sink.update(&ledger.snapshot());
                    return cancelled_entry(task, started);
                }
            }
            Err(err) => {
                task.fail();
                ledger.task_failed();
                sink.update(&ledger.snapshot());
                tracing::warn!(
                    "✗ {} failed after {} attempt(s): {}",
                    task.symbol,
                    task.attempts,
                    err
                );
                return SymbolReport {
                    symbol: task.symbol,
                    outcome: SymbolOutcome::Failed {
                        reason: err.friendly(),
                        permanent: !err.is_retryable(),
                    },
                    attempts: task.attempts,
                    duration: started.elapsed(),
                };
            }
        }
    }
}

fn cancelled_entry(task: BatchTask, started: Instant) -> SymbolReport {
    SymbolReport {
        symbol: task.symbol,
        outcome: SymbolOutcome::Cancelled,
        attempts: task.attempts,
        duration: started.elapsed(),
    }
}

/// Exponential backoff with up to 25% jitter so retries spread out.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
    let jitter = exp.mul_f64(rand::thread_rng().gen_range(0.0..0.25));
    exp + jitter
}
