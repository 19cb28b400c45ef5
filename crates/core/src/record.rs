// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Harvested records persisted by the flat-file store

use serde::{Deserialize, Serialize};

/// One unit of harvested market data.
///
/// `id` is the identity key used for deduplication within a destination
/// file. `sport`, `competition` and `captured_on` route the record to its
/// destination; they are opaque to the store beyond path assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestRecord {
    pub id: String,
    pub source: String,
    pub sport: String,
    pub competition: String,
    /// Capture day, `YYYY-MM-DD`.
    pub captured_on: String,
    /// Remaining payload fields, carried through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl HarvestRecord {
    /// Destination buckets under the store root, in path order.
    pub fn storage_buckets(&self) -> [&str; 3] {
        [&self.sport, &self.competition, &self.captured_on]
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
