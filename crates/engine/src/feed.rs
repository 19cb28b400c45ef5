// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-source polling feeds
//!
//! Each source gets one long-running worker task. Every cycle it makes
//! sure the session is valid (re-authenticating through the auth manager
//! when it is not), fetches a snapshot, stamps provenance and currency
//! onto every market, and publishes it on `odds.<source>`. Control topics:
//! `feed.started.<source>` after the first successful poll (which means it
//! arrives after the first `odds.<source>` event), `feed.error.<source>`
//! on every caught cycle failure, `feed.stopped.<source>` on stop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ovr_adapters::{AdapterError, ProviderAdapter};
use ovr_bus::EventBus;
use ovr_core::{topic, AuthResult, Clock, EventPayload, SystemClock};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::auth::{AuthManager, ProviderMap};

// Extra join allowance on top of the poll interval when stopping.
const STOP_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
enum FeedError {
    #[error("re-authentication failed: {0}")]
    Reauth(String),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

/// Per-feed polling parameters.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Selector ids passed through to the adapter (e.g. sport ids).
    pub selectors: Vec<String>,
    /// ISO 4217 code stamped onto every market and outcome.
    pub currency: String,
    pub poll_interval: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            selectors: Vec::new(),
            currency: "USD".to_string(),
            poll_interval: Duration::from_secs(30),
        }
    }
}

/// Polling loop for a single source.
pub struct PollFeed<C: Clock = SystemClock> {
    name: String,
    adapter: Arc<dyn ProviderAdapter>,
    auth: Arc<AuthManager<C>>,
    bus: Arc<EventBus>,
    config: FeedConfig,
    stop_tx: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl<C: Clock> PollFeed<C> {
    pub fn new(
        name: impl Into<String>,
        adapter: Arc<dyn ProviderAdapter>,
        auth: Arc<AuthManager<C>>,
        bus: Arc<EventBus>,
        config: FeedConfig,
    ) -> Self {
        Self {
            name: name.into(),
            adapter,
            auth,
            bus,
            config,
            stop_tx: None,
            handle: None,
        }
    }

    /// Spawn the worker. The first cycle runs immediately. Re-entrant
    /// `start` on a live feed is a no-op with a warning.
    pub fn start(&mut self) {
        if self.is_running() {
            warn!(source = %self.name, "feed already running");
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let worker = FeedWorker {
            name: self.name.clone(),
            adapter: Arc::clone(&self.adapter),
            auth: Arc::clone(&self.auth),
            bus: Arc::clone(&self.bus),
            selectors: self.config.selectors.clone(),
            currency: self.config.currency.clone(),
            poll_interval: self.config.poll_interval,
        };
        self.stop_tx = Some(stop_tx);
        self.handle = Some(tokio::spawn(worker.run(stop_rx)));
        info!(
            source = %self.name,
            interval_s = self.config.poll_interval.as_secs(),
            "feed started"
        );
    }

    /// Request termination and wait for the worker, bounded by
    /// `poll_interval` plus a grace period. Safe to call repeatedly.
    pub async fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        if let Some(handle) = self.handle.take() {
            let grace = self.config.poll_interval + STOP_GRACE;
            if tokio::time::timeout(grace, handle).await.is_err() {
                warn!(source = %self.name, "feed worker did not stop within grace period");
            }
        }
        self.bus
            .publish(&topic::feed_stopped(&self.name), &self.name, EventPayload::Empty);
        info!(source = %self.name, "feed stopped");
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

struct FeedWorker<C: Clock> {
    name: String,
    adapter: Arc<dyn ProviderAdapter>,
    auth: Arc<AuthManager<C>>,
    bus: Arc<EventBus>,
    selectors: Vec<String>,
    currency: String,
    poll_interval: Duration,
}

impl<C: Clock> FeedWorker<C> {
    async fn run(self, mut stop_rx: watch::Receiver<bool>) {
        let mut first_run = true;
        let mut poll_count: u64 = 0;

        loop {
            match self.poll(&mut poll_count).await {
                Ok(()) => {
                    if first_run {
                        self.bus.publish(
                            &topic::feed_started(&self.name),
                            &self.name,
                            EventPayload::Empty,
                        );
                        first_run = false;
                    }
                }
                Err(e) => {
                    error!(source = %self.name, error = %e, "poll error");
                    self.bus.publish(
                        &topic::feed_error(&self.name),
                        &self.name,
                        EventPayload::Error {
                            message: e.to_string(),
                        },
                    );
                }
            }

            tokio::select! {
                changed = stop_rx.changed() => {
                    // A send or a dropped sender both end the loop.
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    async fn poll(&self, poll_count: &mut u64) -> Result<(), FeedError> {
        if !self.adapter.is_authenticated() {
            info!(source = %self.name, "session invalid, re-authenticating");
            let results = self.auth.refresh_expired().await;
            let ok = results
                .get(&self.name)
                .map(AuthResult::ok)
                .unwrap_or(false);
            if !ok {
                let detail = results
                    .get(&self.name)
                    .and_then(|result| result.error.clone())
                    .unwrap_or_else(|| "session not established".to_string());
                return Err(FeedError::Reauth(detail));
            }
        }

        let mut markets = self.adapter.get_snapshot(&self.selectors).await?;

        // Stamp provenance before the snapshot leaves this worker; it is
        // immutable once published.
        for market in &mut markets {
            market.source = self.name.clone();
            market.currency = self.currency.clone();
            for outcome in &mut market.outcomes {
                outcome.source = self.name.clone();
                outcome.currency = self.currency.clone();
            }
        }

        *poll_count += 1;
        debug!(
            source = %self.name,
            poll = *poll_count,
            markets = markets.len(),
            "poll complete"
        );
        self.bus.publish(
            &topic::odds(&self.name),
            &self.name,
            EventPayload::Markets(Arc::new(markets)),
        );
        Ok(())
    }
}

/// Owns one [`PollFeed`] per authenticated source.
pub struct FeedManager<C: Clock = SystemClock> {
    feeds: HashMap<String, PollFeed<C>>,
}

impl<C: Clock> FeedManager<C> {
    /// Build one feed per `(source, adapter)` pair with a per-source
    /// currency; sources missing from `currencies` default to USD.
    pub fn new(
        clients: ProviderMap,
        auth: Arc<AuthManager<C>>,
        bus: Arc<EventBus>,
        selectors: Vec<String>,
        currencies: &HashMap<String, String>,
        poll_interval: Duration,
    ) -> Self {
        let feeds = clients
            .into_iter()
            .map(|(name, adapter)| {
                let config = FeedConfig {
                    selectors: selectors.clone(),
                    currency: currencies
                        .get(&name)
                        .cloned()
                        .unwrap_or_else(|| "USD".to_string()),
                    poll_interval,
                };
                let feed = PollFeed::new(
                    name.clone(),
                    adapter,
                    Arc::clone(&auth),
                    Arc::clone(&bus),
                    config,
                );
                (name, feed)
            })
            .collect();
        Self { feeds }
    }

    pub fn start_all(&mut self) {
        for feed in self.feeds.values_mut() {
            feed.start();
        }
    }

    /// Stop feeds sequentially; each stop waits for its worker.
    pub async fn stop_all(&mut self) {
        for feed in self.feeds.values_mut() {
            feed.stop().await;
        }
    }

    pub fn status(&self) -> HashMap<String, bool> {
        self.feeds
            .iter()
            .map(|(name, feed)| (name.clone(), feed.is_running()))
            .collect()
    }
}

#[cfg(test)]
#[path = "feed_tests.rs"]
mod tests;
