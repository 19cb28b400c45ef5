// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tick-driven batch scheduler
//!
//! Drives a [`BatchRunner`] on a fixed interval with graceful shutdown.
//! Signal handlers only set an atomic stop flag; the inter-batch wait
//! re-checks the flag every second, so shutdown takes effect within ~1s
//! without preempting the batch in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ovr_core::BatchStats;
use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, error, info};

/// A batch failure, opaque to the scheduler. Logged, never fatal to
/// [`BatchScheduler::run_forever`].
#[derive(Debug, Error)]
#[error("{0}")]
pub struct BatchError(pub String);

impl BatchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// One schedulable unit of work.
#[async_trait]
pub trait BatchRunner: Send + Sync {
    async fn run_batch(&self) -> Result<BatchStats, BatchError>;
}

/// Runs batches on a fixed interval until stopped.
pub struct BatchScheduler<R> {
    runner: R,
    interval: Duration,
    stop: Arc<AtomicBool>,
    batch_count: u64,
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("signal registration failed: {0}")]
    Signal(#[from] std::io::Error),
}

impl<R: BatchRunner> BatchScheduler<R> {
    pub fn new(runner: R, interval: Duration) -> Self {
        Self {
            runner,
            interval,
            stop: Arc::new(AtomicBool::new(false)),
            batch_count: 0,
        }
    }

    /// Handle for requesting shutdown externally (tests, embedding).
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn batch_count(&self) -> u64 {
        self.batch_count
    }

    /// Execute exactly one batch and log a structured summary.
    pub async fn run_once(&mut self) -> Result<BatchStats, BatchError> {
        info!(batch = self.batch_count + 1, "batch starting");
        let start = Instant::now();
        let stats = self.runner.run_batch().await?;
        self.batch_count += 1;
        info!(
            batch = self.batch_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            fetched = stats.records_fetched,
            written = stats.records_written,
            sources_failed = stats.sources_failed,
            "batch complete"
        );
        Ok(stats)
    }

    /// Run batches on the configured interval until an interrupt or
    /// termination signal is observed. The current batch always runs to
    /// completion; no new batch starts after the flag is set.
    pub async fn run_forever(&mut self) -> Result<(), ScheduleError> {
        self.register_signals()?;
        info!(interval_s = self.interval.as_secs(), "scheduler starting");

        while !self.stop.load(Ordering::SeqCst) {
            if let Err(error) = self.run_once().await {
                error!(%error, "batch failed");
            }

            if self.stop.load(Ordering::SeqCst) {
                break;
            }

            debug!(sleep_s = self.interval.as_secs(), "sleeping until next batch");
            let mut remaining = self.interval;
            while !remaining.is_zero() {
                if self.stop.load(Ordering::SeqCst) {
                    break;
                }
                let step = remaining.min(Duration::from_secs(1));
                tokio::time::sleep(step).await;
                remaining -= step;
            }
        }

        info!(batches = self.batch_count, "scheduler stopped");
        Ok(())
    }

    fn register_signals(&self) -> Result<(), ScheduleError> {
        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        let stop = Arc::clone(&self.stop);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = interrupt.recv() => {
                        info!("interrupt received, stopping after current batch");
                    }
                    _ = terminate.recv() => {
                        info!("termination received, stopping after current batch");
                    }
                }
                stop.store(true, Ordering::SeqCst);
            }
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
