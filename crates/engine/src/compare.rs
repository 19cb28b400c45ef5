// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-source odds comparison
//!
//! Markets from different sources are matched by normalized
//! `(event_name, market_name)`, outcomes by normalized name. Every odds
//! value is converted to its USD equivalent first, so GBP-priced and
//! EUR-priced markets compare directly. Rather than a fixed threshold,
//! the filter keeps differences sitting within `fraction_tolerance` of a
//! unit fraction `1/N` for some `N <= max_denominator`.
//!
//! [`OddsListener`] wires this to the bus: it caches the latest snapshot
//! per source and reruns the comparison on every `odds.*` event once
//! enough sources have reported.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ovr_bus::{EventBus, Subscription};
use ovr_core::{topic, Clock, Event, Market, Outcome, SystemClock};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::rates::{ExchangeRates, RateTable};

/// One outcome priced apart by (approximately) a unit fraction.
#[derive(Debug, Clone, PartialEq)]
pub struct OddsDiff {
    pub outcome_name: String,
    pub source_a: String,
    /// Odds already normalized to USD.
    pub odds_a_usd: f64,
    pub source_b: String,
    pub odds_b_usd: f64,
}

impl OddsDiff {
    /// Raw absolute difference in USD-normalized decimal odds.
    pub fn abs_diff(&self) -> f64 {
        round6((self.odds_a_usd - self.odds_b_usd).abs())
    }

    /// The `1/N` closest to the difference, `None` for a zero diff.
    pub fn unit_fraction(&self, max_denominator: u32) -> Option<u32> {
        nearest_unit_fraction(self.abs_diff(), max_denominator).0
    }

    pub fn best_source(&self) -> &str {
        if self.odds_a_usd >= self.odds_b_usd {
            &self.source_a
        } else {
            &self.source_b
        }
    }

    pub fn best_odds_usd(&self) -> f64 {
        self.odds_a_usd.max(self.odds_b_usd)
    }
}

/// All fractional-unit diffs found for one matched market.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketComparison {
    pub event_name: String,
    pub market_name: String,
    pub diffs: Vec<OddsDiff>,
}

impl MarketComparison {
    pub fn max_diff(&self) -> f64 {
        self.diffs
            .iter()
            .map(OddsDiff::abs_diff)
            .fold(0.0, f64::max)
    }

    /// The smallest unit fraction observed, as its denominator.
    pub fn tightest_fraction(&self, max_denominator: u32) -> Option<u32> {
        self.diffs
            .iter()
            .filter_map(|diff| diff.unit_fraction(max_denominator))
            .min()
    }
}

/// `(1/N, error)` for the `N` in `[1, max_denominator]` minimizing
/// `|diff - 1/N|`. A zero diff has no fraction.
pub fn nearest_unit_fraction(diff: f64, max_denominator: u32) -> (Option<u32>, f64) {
    if diff == 0.0 {
        return (None, 0.0);
    }
    let mut best_n = 1;
    let mut best_err = f64::INFINITY;
    for n in 1..=max_denominator.max(1) {
        let err = (diff - 1.0 / f64::from(n)).abs();
        if err < best_err {
            best_err = err;
            best_n = n;
        }
    }
    (Some(best_n), best_err)
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

// USD-equivalent odds; a currency missing from the table drops the
// outcome from comparison rather than poisoning the run.
fn odds_to_usd(outcome: &Outcome, rates: &RateTable) -> Option<f64> {
    match rates.rate(&outcome.currency) {
        Ok(rate) => Some(round6(outcome.odds * rate)),
        Err(e) => {
            warn!(outcome = %outcome.name, error = %e, "skipping outcome");
            None
        }
    }
}

/// Compare odds across sources, keeping only diffs within
/// `fraction_tolerance` of a unit fraction `1/N`, `N <= max_denominator`.
/// Results are sorted by max diff, descending.
pub fn compare_markets(
    markets_by_source: &HashMap<String, Vec<Market>>,
    rates: &RateTable,
    max_denominator: u32,
    fraction_tolerance: f64,
) -> Vec<MarketComparison> {
    let mut indexed: HashMap<(String, String), Vec<(&str, &Market)>> = HashMap::new();
    for (source, markets) in markets_by_source {
        for market in markets {
            let key = (normalize(&market.event_name), normalize(&market.market_name));
            indexed.entry(key).or_default().push((source.as_str(), market));
        }
    }

    let mut comparisons = Vec::new();
    for entries in indexed.into_values() {
        if entries.len() < 2 {
            continue;
        }

        let mut diffs = Vec::new();
        for i in 0..entries.len() {
            for j in (i + 1)..entries.len() {
                let (source_a, market_a) = entries[i];
                let (source_b, market_b) = entries[j];

                let outcomes_a: HashMap<String, &Outcome> = market_a
                    .outcomes
                    .iter()
                    .map(|outcome| (normalize(&outcome.name), outcome))
                    .collect();

                for outcome_b in &market_b.outcomes {
                    let Some(outcome_a) = outcomes_a.get(&normalize(&outcome_b.name)) else {
                        continue;
                    };
                    let (Some(usd_a), Some(usd_b)) =
                        (odds_to_usd(outcome_a, rates), odds_to_usd(outcome_b, rates))
                    else {
                        continue;
                    };

                    let raw_diff = round6((usd_a - usd_b).abs());
                    let (fraction, err) = nearest_unit_fraction(raw_diff, max_denominator);
                    if fraction.is_none() || err > fraction_tolerance {
                        continue;
                    }

                    diffs.push(OddsDiff {
                        outcome_name: outcome_a.name.clone(),
                        source_a: source_a.to_string(),
                        odds_a_usd: usd_a,
                        source_b: source_b.to_string(),
                        odds_b_usd: usd_b,
                    });
                }
            }
        }

        if !diffs.is_empty() {
            let (_, market) = entries[0];
            comparisons.push(MarketComparison {
                event_name: market.event_name.clone(),
                market_name: market.market_name.clone(),
                diffs,
            });
        }
    }

    comparisons.sort_by(|a, b| {
        b.max_diff()
            .partial_cmp(&a.max_diff())
            .unwrap_or(CmpOrdering::Equal)
    });
    comparisons
}

/// Callback invoked with the result of every comparison run.
pub type ComparisonCallback = Arc<dyn Fn(&[MarketComparison]) + Send + Sync>;

/// Default callback: one log line per compared market.
pub fn log_comparisons(comparisons: &[MarketComparison]) {
    if comparisons.is_empty() {
        info!("no fractional-unit odds differences found");
        return;
    }
    for comparison in comparisons {
        info!(
            event = %comparison.event_name,
            market = %comparison.market_name,
            diffs = comparison.diffs.len(),
            max_diff = comparison.max_diff(),
            "fractional-unit difference"
        );
    }
}

/// Comparator tuning.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub max_denominator: u32,
    pub fraction_tolerance: f64,
    /// Comparisons wait until this many sources have reported.
    pub min_sources: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            max_denominator: 20,
            fraction_tolerance: 0.01,
            min_sources: 2,
        }
    }
}

/// Bus subscriber that reruns the comparison on every odds snapshot.
pub struct OddsListener<C: Clock = SystemClock> {
    bus: Arc<EventBus>,
    inner: Arc<ListenerInner<C>>,
    sub: Option<Subscription>,
}

struct ListenerInner<C: Clock> {
    rates: Arc<ExchangeRates<C>>,
    config: ListenerConfig,
    on_comparison: ComparisonCallback,
    snapshots: Mutex<HashMap<String, Vec<Market>>>,
    comparison_count: AtomicU64,
}

impl<C: Clock> OddsListener<C> {
    pub fn new(
        bus: Arc<EventBus>,
        rates: Arc<ExchangeRates<C>>,
        config: ListenerConfig,
        on_comparison: ComparisonCallback,
    ) -> Self {
        Self {
            bus,
            inner: Arc::new(ListenerInner {
                rates,
                config,
                on_comparison,
                snapshots: Mutex::new(HashMap::new()),
                comparison_count: AtomicU64::new(0),
            }),
            sub: None,
        }
    }

    /// Subscribe to odds topics on the bus.
    pub fn start(&mut self) {
        if self.sub.is_some() {
            return;
        }
        let inner = Arc::clone(&self.inner);
        self.sub = Some(self.bus.subscribe(topic::ODDS_ALL, move |event: &Event| {
            inner.handle(event);
            Ok(())
        }));
        info!(
            min_sources = self.inner.config.min_sources,
            "listener subscribed to odds topics"
        );
    }

    /// Unsubscribe from the bus.
    pub fn stop(&mut self) {
        if let Some(sub) = self.sub.take() {
            self.bus.unsubscribe(&sub);
            info!("listener unsubscribed");
        }
    }

    pub fn comparison_count(&self) -> u64 {
        self.inner.comparison_count.load(Ordering::SeqCst)
    }
}

impl<C: Clock> ListenerInner<C> {
    fn handle(&self, event: &Event) {
        let Some(markets) = event.payload.markets() else {
            return;
        };

        let snapshot = {
            let mut snapshots = self.snapshots.lock();
            snapshots.insert(event.source.clone(), markets.to_vec());
            snapshots.clone()
        };

        // Re-checked on every event: a source publishing twice before a
        // second source appears produces no comparison.
        if snapshot.len() < self.config.min_sources {
            debug!(
                have = snapshot.len(),
                want = self.config.min_sources,
                "waiting for more sources"
            );
            return;
        }

        // Run the comparison off the lock with the cached rate table.
        let table = self.rates.table();
        let comparisons = compare_markets(
            &snapshot,
            &table,
            self.config.max_denominator,
            self.config.fraction_tolerance,
        );
        let count = self.comparison_count.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            comparison = count,
            trigger = %event.source,
            markets_with_diffs = comparisons.len(),
            "comparison complete"
        );
        (self.on_comparison)(&comparisons);
    }
}

#[cfg(test)]
#[path = "compare_tests.rs"]
mod tests;
