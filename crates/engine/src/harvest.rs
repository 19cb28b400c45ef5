// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Harvest batches: authenticate, fetch, map, store
//!
//! One batch walks every configured source: sessions are refreshed through
//! the auth manager, each authenticated adapter contributes one snapshot,
//! markets become day-bucketed [`HarvestRecord`]s and land in the
//! deduplicating store. A misbehaving source only bumps `sources_failed`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use ovr_core::{BatchStats, Clock, HarvestRecord, Market, SystemClock};
use ovr_storage::FileStore;
use tracing::{debug, error};

use crate::auth::AuthManager;
use crate::scheduler::{BatchError, BatchRunner};

/// Maps one market into its stored form.
///
/// Identity is the market id; the destination is bucketed by sport, a
/// slug of the event name, and the capture day. The full outcome list
/// rides along in the payload.
pub fn record_from_market(market: &Market, sport: &str, day: &str) -> HarvestRecord {
    let mut extra = serde_json::Map::new();
    extra.insert(
        "market_name".to_string(),
        serde_json::Value::String(market.market_name.clone()),
    );
    extra.insert(
        "event_name".to_string(),
        serde_json::Value::String(market.event_name.clone()),
    );
    extra.insert(
        "currency".to_string(),
        serde_json::Value::String(market.currency.clone()),
    );
    extra.insert(
        "outcomes".to_string(),
        serde_json::to_value(&market.outcomes).unwrap_or_default(),
    );

    HarvestRecord {
        id: market.market_id.clone(),
        source: market.source.clone(),
        sport: sport.to_string(),
        competition: slug(&market.event_name),
        captured_on: day.to_string(),
        extra,
    }
}

// Lowercased ASCII alphanumerics with dash-collapsed separators, so event
// names become stable path segments.
fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() {
        "unknown".to_string()
    } else {
        out
    }
}

/// The harvest flow's [`BatchRunner`].
pub struct HarvestRunner<C: Clock = SystemClock> {
    auth: Arc<AuthManager<C>>,
    store: FileStore,
    selectors: Vec<String>,
    sport: String,
}

impl<C: Clock> HarvestRunner<C> {
    pub fn new(
        auth: Arc<AuthManager<C>>,
        store: FileStore,
        selectors: Vec<String>,
        sport: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            store,
            selectors,
            sport: sport.into(),
        }
    }
}

#[async_trait]
impl<C: Clock> BatchRunner for HarvestRunner<C> {
    async fn run_batch(&self) -> Result<BatchStats, BatchError> {
        let mut stats = BatchStats::default();

        self.auth.authenticate_all(false).await;
        let clients = self.auth.authenticated_clients();
        stats.sources_failed += self.auth.source_count() - clients.len();

        let day = Utc::now().format("%Y-%m-%d").to_string();

        for (name, adapter) in clients {
            match adapter.get_snapshot(&self.selectors).await {
                Ok(markets) => {
                    let records: Vec<HarvestRecord> = markets
                        .iter()
                        .map(|market| record_from_market(market, &self.sport, &day))
                        .collect();
                    stats.records_fetched += records.len();
                    debug!(source = %name, fetched = records.len(), "snapshot fetched");

                    let store = self.store.clone();
                    let written =
                        match tokio::task::spawn_blocking(move || store.save(&records)).await {
                            Ok(written) => written,
                            Err(e) => {
                                error!(source = %name, error = %e, "store task failed");
                                0
                            }
                        };
                    stats.records_written += written;
                    stats.sources_ok += 1;
                }
                Err(e) => {
                    error!(source = %name, error = %e, "snapshot fetch failed");
                    stats.sources_failed += 1;
                }
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
#[path = "harvest_tests.rs"]
mod tests;
