//! Flush workers.
//!
//! Each worker pulls records from the shared [`RecordQueue`], hands them to a
//! [`Forwarder`] and acts on the outcome: retryable failures are re-attempted
//! with capped exponential backoff, fatal ones are dropped. After shutdown is
//! signalled the workers drain what is left in the queue with one attempt
//! per record.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::adapter::queue::{QueuedRecord, RecordQueue};
use crate::dispatch::ExportOutcome;
use crate::port::Forwarder;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts per record, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Delay before re-attempt number `attempt + 1`.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let multiplier = 2_u32.saturating_pow(attempt);
        let delay = self
            .base_delay
            .saturating_mul(multiplier)
            .min(self.max_delay);

        if self.jitter {
            let factor = rand::rng().random_range(0.5..1.5); // ±50% jitter
            delay.mul_f64(factor)
        } else {
            delay
        }
    }
}

/// Per-worker delivery counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub sent: u64,
    pub dropped: u64,
}

impl std::ops::AddAssign for FlushStats {
    fn add_assign(&mut self, other: Self) {
        self.sent += other.sent;
        self.dropped += other.dropped;
    }
}

pub struct FlushWorkers {
    handles: Vec<JoinHandle<FlushStats>>,
}

impl FlushWorkers {
    /// Waits for every worker to finish and sums their counts.
    pub async fn join(self) -> FlushStats {
        let mut total = FlushStats::default();
        for handle in self.handles {
            match handle.await {
                Ok(stats) => total += stats,
                Err(e) => error!(error = %e, "Flush worker panicked"),
            }
        }
        total
    }
}

/// Spawns `workers` flush tasks that run until `shutdown` is cancelled and
/// the queue is drained.
#[must_use]
pub fn spawn_workers(
    queue: RecordQueue,
    forwarder: Arc<dyn Forwarder>,
    retry: RetryConfig,
    workers: usize,
    shutdown: CancellationToken,
) -> FlushWorkers {
    let handles = (0..workers.max(1))
        .map(|id| {
            tokio::spawn(worker_loop(
                id,
                queue.clone(),
                forwarder.clone(),
                retry.clone(),
                shutdown.clone(),
            ))
        })
        .collect();
    info!(workers, "Flush workers started");
    FlushWorkers { handles }
}

async fn worker_loop(
    id: usize,
    queue: RecordQueue,
    forwarder: Arc<dyn Forwarder>,
    retry: RetryConfig,
    shutdown: CancellationToken,
) -> FlushStats {
    let mut stats = FlushStats::default();

    loop {
        let next = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            next = queue.recv() => next,
        };
        let Some(queued) = next else {
            break;
        };
        record(&mut stats, deliver(&*forwarder, &queued, &retry, &shutdown).await);
    }

    // New emissions fail with `SinkError::Closed` from here on.
    queue.close().await;
    let mut drained = 0_u64;
    while let Some(queued) = queue.try_recv().await {
        drained += 1;
        record(&mut stats, deliver(&*forwarder, &queued, &retry, &shutdown).await);
    }

    info!(
        worker = id,
        sent = stats.sent,
        dropped = stats.dropped,
        drained,
        "Flush worker stopped"
    );
    stats
}

fn record(stats: &mut FlushStats, sent: bool) {
    if sent {
        stats.sent += 1;
    } else {
        stats.dropped += 1;
    }
}

/// Returns whether the record was delivered.
async fn deliver(
    forwarder: &dyn Forwarder,
    queued: &QueuedRecord,
    retry: &RetryConfig,
    shutdown: &CancellationToken,
) -> bool {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match forwarder.forward(&queued.record).await {
            ExportOutcome::Success => {
                debug!(tag = %queued.tag, attempt, "Record forwarded");
                return true;
            }
            ExportOutcome::FatalFailure { message } => {
                error!(tag = %queued.tag, error = %message, "Dropping record after unrecoverable failure");
                return false;
            }
            ExportOutcome::RetryableFailure { code, message } => {
                if attempt >= retry.max_attempts || shutdown.is_cancelled() {
                    error!(
                        tag = %queued.tag,
                        attempt,
                        error = %message,
                        "Dropping record, retry limit reached"
                    );
                    return false;
                }
                let delay = retry.calculate_delay(attempt - 1);
                warn!(
                    tag = %queued.tag,
                    attempt,
                    code = ?code,
                    delay_ms = delay.as_millis() as u64,
                    "Retryable export failure, backing off"
                );
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = shutdown.cancelled() => {}
                }
            }
        }
    }
}
