// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graceful shutdown discipline of the batch scheduler.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ovr_core::BatchStats;
use ovr_engine::{BatchError, BatchRunner, BatchScheduler};

struct CleanRunner;

#[async_trait]
impl BatchRunner for CleanRunner {
    async fn run_batch(&self) -> Result<BatchStats, BatchError> {
        Ok(BatchStats {
            records_fetched: 1,
            records_written: 1,
            sources_failed: 0,
            sources_ok: 1,
        })
    }
}

#[tokio::test]
async fn shutdown_takes_effect_within_the_polling_step() {
    let mut scheduler = BatchScheduler::new(CleanRunner, Duration::from_secs(5));
    let stop = scheduler.stop_flag();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        stop.store(true, Ordering::SeqCst);
    });

    let started = Instant::now();
    scheduler.run_forever().await.unwrap();

    // One batch ran; the inter-batch wait noticed the flag at its next
    // one-second check instead of sleeping the full five seconds.
    assert_eq!(scheduler.batch_count(), 1);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn no_batch_starts_once_the_flag_is_set() {
    let mut scheduler = BatchScheduler::new(CleanRunner, Duration::from_millis(10));
    scheduler.stop_flag().store(true, Ordering::SeqCst);

    scheduler.run_forever().await.unwrap();
    assert_eq!(scheduler.batch_count(), 0);
}
