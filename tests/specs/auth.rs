// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session expiry and refresh across the auth manager.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ovr_adapters::{FakeProvider, ProviderAdapter};
use ovr_core::{AuthStatus, FakeClock};
use ovr_engine::AuthManager;

#[tokio::test]
async fn sessions_expire_then_refresh() {
    let provider = FakeProvider::new("betfair");
    let mut clients: HashMap<String, Arc<dyn ProviderAdapter>> = HashMap::new();
    clients.insert(
        "betfair".to_string(),
        Arc::new(provider.clone()) as Arc<dyn ProviderAdapter>,
    );

    let clock = FakeClock::new();
    let manager = AuthManager::with_clock(clients, Duration::from_secs(1), clock.clone());

    let results = manager.authenticate_all(false).await;
    assert_eq!(results["betfair"].status, AuthStatus::Success);
    assert_eq!(manager.authenticated_clients().len(), 1);

    clock.advance(Duration::from_secs(2));

    // Every read treats the aged session as expired.
    assert!(manager.authenticated_clients().is_empty());
    assert_eq!(manager.status()["betfair"].status, AuthStatus::Expired);

    let results = manager.refresh_expired().await;
    assert_eq!(results["betfair"].status, AuthStatus::Success);
    assert_eq!(manager.authenticated_clients().len(), 1);
    assert_eq!(provider.auth_count(), 2);
}

#[tokio::test]
async fn authenticate_all_with_valid_sessions_makes_no_adapter_calls() {
    let provider = FakeProvider::new("betfair");
    let mut clients: HashMap<String, Arc<dyn ProviderAdapter>> = HashMap::new();
    clients.insert(
        "betfair".to_string(),
        Arc::new(provider.clone()) as Arc<dyn ProviderAdapter>,
    );

    let manager = AuthManager::new(clients, Duration::from_secs(3600));
    manager.authenticate_all(false).await;

    let before = provider.auth_count();
    let results = manager.authenticate_all(false).await;

    assert_eq!(provider.auth_count(), before);
    assert_eq!(results["betfair"].status, AuthStatus::Success);
}
