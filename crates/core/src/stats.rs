// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch counters for the harvest flow

use serde::{Deserialize, Serialize};

/// Counters produced by one harvest batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub records_fetched: usize,
    pub records_written: usize,
    pub sources_failed: usize,
    pub sources_ok: usize,
}
