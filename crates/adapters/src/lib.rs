// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ovr-adapters: remote provider adapters

pub mod provider;

pub use provider::{AdapterError, FieldPaths, ProviderAdapter, RestProvider, RestProviderConfig};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use provider::{AuthOutcome, FakeProvider, ProviderCall, SnapshotOutcome};
