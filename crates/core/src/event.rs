// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events published on the topic bus

use std::sync::Arc;

use crate::clock::epoch_ms_now;
use crate::market::Market;

/// Payload attached to a bus event.
#[derive(Debug, Clone, Default)]
pub enum EventPayload {
    #[default]
    Empty,
    /// A full market snapshot from one source.
    Markets(Arc<Vec<Market>>),
    /// A caught failure, e.g. a poll error.
    Error { message: String },
}

impl EventPayload {
    pub fn markets(&self) -> Option<&[Market]> {
        match self {
            EventPayload::Markets(markets) => Some(markets),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            EventPayload::Error { message } => Some(message),
            _ => None,
        }
    }
}

/// One event on the topic bus.
#[derive(Debug, Clone)]
pub struct Event {
    /// Dot-separated topic, e.g. `odds.betfair`.
    pub topic: String,
    /// Provenance: the source this event was emitted on behalf of.
    pub source: String,
    pub payload: EventPayload,
    /// Publish time, epoch milliseconds.
    pub timestamp_ms: u64,
}

impl Event {
    pub fn new(
        topic: impl Into<String>,
        source: impl Into<String>,
        payload: EventPayload,
    ) -> Self {
        Self {
            topic: topic.into(),
            source: source.into(),
            payload,
            timestamp_ms: epoch_ms_now(),
        }
    }
}
