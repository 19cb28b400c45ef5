// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Market snapshot types for the live odds flow

use serde::{Deserialize, Serialize};

fn default_currency() -> String {
    "USD".to_string()
}

/// One priced selection within a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// e.g. "Man Utd", "Draw", "Chelsea"
    pub name: String,
    /// Decimal odds in the source's native currency.
    pub odds: f64,
    /// Source that priced this outcome.
    pub source: String,
    /// ISO 4217 code, stamped by the poll feed.
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Outcome {
    pub fn new(name: impl Into<String>, odds: f64, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            odds,
            source: source.into(),
            currency: default_currency(),
        }
    }
}

/// One market produced by a provider poll.
///
/// Immutable once published on the bus; the poll feed stamps `currency`
/// onto the market and each outcome before publishing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub market_id: String,
    /// e.g. "Match Odds"
    pub market_name: String,
    /// e.g. "Man Utd vs Chelsea"
    pub event_name: String,
    pub source: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
}

impl Market {
    pub fn new(
        market_id: impl Into<String>,
        market_name: impl Into<String>,
        event_name: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            market_id: market_id.into(),
            market_name: market_name.into(),
            event_name: event_name.into(),
            source: source.into(),
            currency: default_currency(),
            outcomes: Vec::new(),
        }
    }
}
