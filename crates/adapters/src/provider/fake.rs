// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake provider adapter for testing

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use ovr_core::Market;
use parking_lot::Mutex;

use super::{AdapterError, ProviderAdapter};

/// Recorded provider call
#[derive(Debug, Clone)]
pub enum ProviderCall {
    Authenticate,
    GetSnapshot { selectors: Vec<String> },
}

/// Scripted outcome for one `authenticate()` call
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    Granted,
    Refused,
    Error(String),
}

/// Scripted outcome for one `get_snapshot()` call
#[derive(Debug, Clone)]
pub enum SnapshotOutcome {
    Markets(Vec<Market>),
    Error(String),
}

#[derive(Debug)]
struct FakeProviderState {
    calls: Vec<ProviderCall>,
    auth_script: VecDeque<AuthOutcome>,
    snapshot_script: VecDeque<SnapshotOutcome>,
    authenticated: bool,
}

/// Fake provider adapter for testing.
///
/// Clones share state, so a test can keep one handle while the pipeline
/// under test holds another. Unscripted calls default to `Granted` auth
/// and empty snapshots.
#[derive(Debug, Clone)]
pub struct FakeProvider {
    name: String,
    inner: Arc<Mutex<FakeProviderState>>,
}

impl FakeProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inner: Arc::new(Mutex::new(FakeProviderState {
                calls: Vec::new(),
                auth_script: VecDeque::new(),
                snapshot_script: VecDeque::new(),
                authenticated: false,
            })),
        }
    }

    /// Queue the outcome of the next unscripted `authenticate()` call.
    pub fn push_auth(&self, outcome: AuthOutcome) {
        self.inner.lock().auth_script.push_back(outcome);
    }

    /// Queue the outcome of the next `get_snapshot()` call.
    pub fn push_snapshot(&self, outcome: SnapshotOutcome) {
        self.inner.lock().snapshot_script.push_back(outcome);
    }

    /// Force the adapter's own view of its session, e.g. to simulate a
    /// server-side invalidation between polls.
    pub fn set_authenticated(&self, authenticated: bool) {
        self.inner.lock().authenticated = authenticated;
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.inner.lock().calls.clone()
    }

    pub fn auth_count(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|call| matches!(call, ProviderCall::Authenticate))
            .count()
    }

    pub fn snapshot_count(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|call| matches!(call, ProviderCall::GetSnapshot { .. }))
            .count()
    }
}

#[async_trait]
impl ProviderAdapter for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn authenticate(&self) -> Result<bool, AdapterError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProviderCall::Authenticate);

        match inner.auth_script.pop_front().unwrap_or(AuthOutcome::Granted) {
            AuthOutcome::Granted => {
                inner.authenticated = true;
                Ok(true)
            }
            AuthOutcome::Refused => {
                inner.authenticated = false;
                Ok(false)
            }
            AuthOutcome::Error(message) => {
                inner.authenticated = false;
                Err(AdapterError::AuthFailed(message))
            }
        }
    }

    fn is_authenticated(&self) -> bool {
        self.inner.lock().authenticated
    }

    async fn get_snapshot(&self, selectors: &[String]) -> Result<Vec<Market>, AdapterError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProviderCall::GetSnapshot {
            selectors: selectors.to_vec(),
        });

        match inner.snapshot_script.pop_front() {
            Some(SnapshotOutcome::Markets(markets)) => Ok(markets),
            Some(SnapshotOutcome::Error(message)) => {
                Err(AdapterError::UnexpectedResponse(message))
            }
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
