// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authentication manager
//!
//! Authenticates all configured providers concurrently and tracks session
//! state per source. A session that succeeded more than `token_ttl` ago is
//! treated as expired by every read and re-established on the next refresh.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ovr_adapters::ProviderAdapter;
use ovr_core::{AuthResult, AuthStatus, Clock, SystemClock};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Adapters keyed by source name.
pub type ProviderMap = HashMap<String, Arc<dyn ProviderAdapter>>;

const DEFAULT_MAX_WORKERS: usize = 8;

/// Concurrent authentication across providers with per-source results.
pub struct AuthManager<C: Clock = SystemClock> {
    clients: ProviderMap,
    token_ttl: Duration,
    max_workers: usize,
    clock: C,
    results: Mutex<HashMap<String, AuthResult>>,
}

impl AuthManager<SystemClock> {
    pub fn new(clients: ProviderMap, token_ttl: Duration) -> Self {
        Self::with_clock(clients, token_ttl, SystemClock)
    }
}

impl<C: Clock> AuthManager<C> {
    pub fn with_clock(clients: ProviderMap, token_ttl: Duration, clock: C) -> Self {
        let results = clients
            .keys()
            .map(|name| (name.clone(), AuthResult::pending(name)))
            .collect();
        Self {
            clients,
            token_ttl,
            max_workers: DEFAULT_MAX_WORKERS,
            clock,
            results: Mutex::new(results),
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Number of configured sources, authenticated or not.
    pub fn source_count(&self) -> usize {
        self.clients.len()
    }

    /// Authenticate every client whose session is missing, failed, expired
    /// or older than the token TTL; `force` re-authenticates all of them.
    ///
    /// Attempts run on a bounded worker pool of
    /// `min(max_workers, targets)` and are fully joined before this
    /// returns. A zero-target call performs no adapter calls and returns
    /// the current results map.
    pub async fn authenticate_all(&self, force: bool) -> HashMap<String, AuthResult> {
        let targets: Vec<(String, Arc<dyn ProviderAdapter>)> = {
            let results = self.results.lock();
            self.clients
                .iter()
                .filter(|(name, _)| force || self.needs_auth(&results, name))
                .map(|(name, adapter)| (name.clone(), Arc::clone(adapter)))
                .collect()
        };

        if targets.is_empty() {
            info!("all sessions already valid, nothing to do");
            return self.results.lock().clone();
        }

        let names: Vec<&str> = targets.iter().map(|(name, _)| name.as_str()).collect();
        info!(sources = ?names, "authenticating concurrently");

        let pool = Arc::new(Semaphore::new(self.max_workers.min(targets.len())));
        let mut attempts = JoinSet::new();
        for (name, adapter) in targets {
            let pool = Arc::clone(&pool);
            attempts.spawn(async move {
                // Errs only if the semaphore is closed, which cannot happen
                // while this task holds a clone of it.
                let _permit = pool.acquire_owned().await;
                auth_one(name, adapter).await
            });
        }

        while let Some(joined) = attempts.join_next().await {
            match joined {
                Ok((name, outcome)) => {
                    let result = match outcome {
                        Ok(true) => AuthResult::success(&name, self.clock.epoch_ms()),
                        Ok(false) => {
                            AuthResult::failed(&name, "authenticate() returned false")
                        }
                        Err(error) => AuthResult::failed(&name, error),
                    };
                    info!(source = %name, "{result}");
                    self.results.lock().insert(name, result);
                }
                Err(error) => warn!(%error, "auth attempt did not complete"),
            }
        }

        self.results.lock().clone()
    }

    /// Re-authenticate any sessions that have expired or failed.
    pub async fn refresh_expired(&self) -> HashMap<String, AuthResult> {
        let stale: Vec<String> = {
            let results = self.results.lock();
            let now = self.clock.epoch_ms();
            results
                .values()
                .filter(|result| {
                    result.status != AuthStatus::Success
                        || result.is_stale(self.ttl_ms(), now)
                })
                .map(|result| result.source.clone())
                .collect()
        };

        if stale.is_empty() {
            return self.results.lock().clone();
        }

        info!(sources = ?stale, "refreshing stale sessions");
        self.authenticate_all(false).await
    }

    /// Only the adapters whose session is currently valid.
    ///
    /// Sweeps time-expired sessions to `Expired` first; the returned map is
    /// fresh and detached from internal state.
    pub fn authenticated_clients(&self) -> ProviderMap {
        self.mark_expired();
        let results = self.results.lock();
        self.clients
            .iter()
            .filter(|(name, _)| results.get(*name).map(AuthResult::ok).unwrap_or(false))
            .map(|(name, adapter)| (name.clone(), Arc::clone(adapter)))
            .collect()
    }

    /// Snapshot of every source's auth result, after the expiry sweep.
    pub fn status(&self) -> HashMap<String, AuthResult> {
        self.mark_expired();
        self.results.lock().clone()
    }

    fn ttl_ms(&self) -> u64 {
        self.token_ttl.as_millis() as u64
    }

    fn needs_auth(&self, results: &HashMap<String, AuthResult>, name: &str) -> bool {
        match results.get(name) {
            Some(result) => match result.status {
                AuthStatus::Pending | AuthStatus::Failed | AuthStatus::Expired => true,
                AuthStatus::Success => result.is_stale(self.ttl_ms(), self.clock.epoch_ms()),
            },
            None => true,
        }
    }

    fn mark_expired(&self) {
        let now = self.clock.epoch_ms();
        let ttl = self.ttl_ms();
        let mut results = self.results.lock();
        for result in results.values_mut() {
            if result.status == AuthStatus::Success && result.is_stale(ttl, now) {
                *result = AuthResult::expired(result.source.clone(), result.authenticated_at);
            }
        }
    }
}

// One authentication attempt; failures are captured, never propagated.
async fn auth_one(
    name: String,
    adapter: Arc<dyn ProviderAdapter>,
) -> (String, Result<bool, String>) {
    match adapter.authenticate().await {
        Ok(ok) => (name, Ok(ok)),
        Err(error) => (name, Err(error.to_string())),
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
