// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider adapter contract

mod rest;

pub use rest::{FieldPaths, RestProvider, RestProviderConfig};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{AuthOutcome, FakeProvider, ProviderCall, SnapshotOutcome};

use async_trait::async_trait;
use ovr_core::Market;
use thiserror::Error;

/// Errors from provider operations
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Capability contract for one remote data provider.
///
/// Adapters are constructed externally and injected; the pipeline depends
/// only on this trait and holds adapters as `Arc<dyn ProviderAdapter>`.
/// Mapping raw responses into [`Market`] values is adapter-internal.
#[async_trait]
pub trait ProviderAdapter: Send + Sync + std::fmt::Debug {
    /// Stable source identifier, used as the provenance tag on records
    /// and events.
    fn name(&self) -> &str;

    /// Establish a session. `Ok(true)` iff a valid session now exists;
    /// `Ok(false)` is a refusal, `Err` a transport or protocol failure.
    /// After `Ok(true)`, [`Self::is_authenticated`] must report `true`.
    async fn authenticate(&self) -> Result<bool, AdapterError>;

    /// Whether the adapter believes its session is currently valid.
    fn is_authenticated(&self) -> bool;

    /// Fetch one snapshot for the given selectors (e.g. sport ids).
    async fn get_snapshot(&self, selectors: &[String]) -> Result<Vec<Market>, AdapterError>;
}
