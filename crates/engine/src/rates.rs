// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! FX rates normalized to USD
//!
//! The comparator needs every odds value on one stake basis. Rates are
//! fetched through a pluggable [`RateSource`], cached for five minutes,
//! and handed out as an immutable [`RateTable`] snapshot so subscribers
//! can convert without touching the network.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use ovr_core::{Clock, SystemClock};
use parking_lot::Mutex;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

// Frankfurter is a free, ECB-backed FX API; no key required.
const FRANKFURTER_URL: &str = "https://api.frankfurter.app/latest";

#[derive(Debug, Error)]
pub enum RatesError {
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),
    #[error("rate fetch failed: {0}")]
    Fetch(String),
}

/// Source of USD-per-unit rates, keyed by ISO 4217 code.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch(&self) -> Result<HashMap<String, f64>, RatesError>;
}

/// Fixed rates for tests and offline configuration.
pub struct StaticSource {
    rates: HashMap<String, f64>,
}

impl StaticSource {
    /// `pairs` are `(currency, usd_per_unit)`.
    pub fn new(pairs: &[(&str, f64)]) -> Self {
        Self {
            rates: pairs
                .iter()
                .map(|(ccy, rate)| (ccy.to_uppercase(), *rate))
                .collect(),
        }
    }
}

#[async_trait]
impl RateSource for StaticSource {
    async fn fetch(&self) -> Result<HashMap<String, f64>, RatesError> {
        Ok(self.rates.clone())
    }
}

#[derive(Debug, Deserialize)]
struct FrankfurterBody {
    rates: HashMap<String, f64>,
}

/// Live rates from frankfurter.app.
pub struct FrankfurterSource {
    client: reqwest::Client,
    url: String,
}

impl Default for FrankfurterSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrankfurterSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            url: FRANKFURTER_URL.to_string(),
        }
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl RateSource for FrankfurterSource {
    async fn fetch(&self) -> Result<HashMap<String, f64>, RatesError> {
        let body: FrankfurterBody = self
            .client
            .get(&self.url)
            .query(&[("base", "USD")])
            .send()
            .await
            .map_err(|e| RatesError::Fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| RatesError::Fetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| RatesError::Fetch(e.to_string()))?;

        // The API reports units of foreign currency per USD; invert to
        // USD per unit.
        let rates = body
            .rates
            .into_iter()
            .filter(|(_, per_usd)| *per_usd > 0.0)
            .map(|(ccy, per_usd)| (ccy, round8(1.0 / per_usd)))
            .collect();
        Ok(rates)
    }
}

/// Immutable rate snapshot usable from synchronous subscribers.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<String, f64>,
}

impl RateTable {
    /// USD value of one unit of `currency`. USD itself is always 1.0.
    pub fn rate(&self, currency: &str) -> Result<f64, RatesError> {
        let currency = currency.to_uppercase();
        if currency == "USD" {
            return Ok(1.0);
        }
        self.rates
            .get(&currency)
            .copied()
            .ok_or(RatesError::UnsupportedCurrency(currency))
    }

    pub fn to_usd(&self, amount: f64, currency: &str) -> Result<f64, RatesError> {
        Ok(round6(amount * self.rate(currency)?))
    }

    pub fn from_usd(&self, usd_amount: f64, currency: &str) -> Result<f64, RatesError> {
        Ok(round6(usd_amount / self.rate(currency)?))
    }

    pub fn available_currencies(&self) -> Vec<String> {
        let mut currencies: Vec<String> = self.rates.keys().cloned().collect();
        currencies.push("USD".to_string());
        currencies.sort();
        currencies
    }
}

struct RatesState {
    rates: HashMap<String, f64>,
    fetched_at_ms: Option<u64>,
}

/// Caching front for a [`RateSource`].
pub struct ExchangeRates<C: Clock = SystemClock> {
    source: Box<dyn RateSource>,
    cache_ttl: Duration,
    clock: C,
    state: Mutex<RatesState>,
}

impl ExchangeRates<SystemClock> {
    pub fn new(source: Box<dyn RateSource>) -> Self {
        Self::with_clock(source, SystemClock)
    }
}

impl<C: Clock> ExchangeRates<C> {
    pub fn with_clock(source: Box<dyn RateSource>, clock: C) -> Self {
        Self {
            source,
            cache_ttl: DEFAULT_CACHE_TTL,
            clock,
            state: Mutex::new(RatesState {
                rates: HashMap::new(),
                fetched_at_ms: None,
            }),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Refetch when the cache is empty or older than the TTL. A failed
    /// refetch keeps previously loaded rates and only errors when none
    /// exist yet.
    pub async fn ensure_fresh(&self) -> Result<(), RatesError> {
        let fresh = {
            let state = self.state.lock();
            match state.fetched_at_ms {
                Some(at) if !state.rates.is_empty() => {
                    self.clock.epoch_ms().saturating_sub(at)
                        < self.cache_ttl.as_millis() as u64
                }
                _ => false,
            }
        };
        if fresh {
            return Ok(());
        }

        match self.source.fetch().await {
            Ok(rates) => {
                info!(currencies = rates.len(), "rates refreshed");
                let mut state = self.state.lock();
                state.rates = rates;
                state.fetched_at_ms = Some(self.clock.epoch_ms());
                Ok(())
            }
            Err(e) => {
                let have_rates = !self.state.lock().rates.is_empty();
                if have_rates {
                    warn!(error = %e, "rate refresh failed, keeping stale rates");
                    Ok(())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Current cached rates as an immutable snapshot.
    pub fn table(&self) -> RateTable {
        RateTable {
            rates: self.state.lock().rates.clone(),
        }
    }

    /// Epoch ms of the last successful fetch.
    pub fn last_updated_ms(&self) -> Option<u64> {
        self.state.lock().fetched_at_ms
    }
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

fn round8(value: f64) -> f64 {
    (value * 1e8).round() / 1e8
}

#[cfg(test)]
#[path = "rates_tests.rs"]
mod tests;
