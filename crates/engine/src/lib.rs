// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ovr-engine: the polling pipeline runtime

pub mod auth;
pub mod compare;
pub mod feed;
pub mod harvest;
pub mod rates;
pub mod scheduler;

pub use auth::{AuthManager, ProviderMap};
pub use compare::{
    compare_markets, log_comparisons, ComparisonCallback, ListenerConfig, MarketComparison,
    OddsDiff, OddsListener,
};
pub use feed::{FeedConfig, FeedManager, PollFeed};
pub use harvest::{record_from_market, HarvestRunner};
pub use rates::{
    ExchangeRates, FrankfurterSource, RateSource, RateTable, RatesError, StaticSource,
};
pub use scheduler::{BatchError, BatchRunner, BatchScheduler, ScheduleError};
