// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dot-separated topic names
//!
//! The first segment is the event kind; later segments refine it:
//! `odds.betfair`, `feed.started.betfair`, `feed.error.matchbook`.

/// Pattern matching every odds snapshot topic.
pub const ODDS_ALL: &str = "odds.*";
/// Pattern matching every feed control topic.
pub const FEED_ALL: &str = "feed.*";

/// Snapshot topic for one source.
pub fn odds(source: &str) -> String {
    format!("odds.{source}")
}

/// Published after the first successful poll of a feed.
pub fn feed_started(source: &str) -> String {
    format!("feed.started.{source}")
}

/// Published when a feed is stopped.
pub fn feed_stopped(source: &str) -> String {
    format!("feed.stopped.{source}")
}

/// Published on every caught poll-cycle failure.
pub fn feed_error(source: &str) -> String {
    format!("feed.error.{source}")
}

#[cfg(test)]
#[path = "topic_tests.rs"]
mod tests;
