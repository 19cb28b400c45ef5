// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The feed error path: a failing poll surfaces as an error event and
//! the loop recovers on the next cycle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ovr_adapters::{FakeProvider, ProviderAdapter, SnapshotOutcome};
use ovr_bus::EventBus;
use ovr_core::{Event, Market, Outcome};
use ovr_engine::{AuthManager, FeedConfig, PollFeed};

fn market() -> Market {
    let mut market = Market::new("1.1", "Match Odds", "A vs B", "src");
    market.outcomes.push(Outcome::new("Home", 2.0, "src"));
    market
}

#[tokio::test]
async fn error_cycle_is_published_between_snapshots() {
    let provider = FakeProvider::new("src");
    provider.set_authenticated(true);
    provider.push_snapshot(SnapshotOutcome::Markets(vec![market()]));
    provider.push_snapshot(SnapshotOutcome::Error("upstream 500".to_string()));
    provider.push_snapshot(SnapshotOutcome::Markets(vec![market()]));

    let mut clients: HashMap<String, Arc<dyn ProviderAdapter>> = HashMap::new();
    clients.insert(
        "src".to_string(),
        Arc::new(provider) as Arc<dyn ProviderAdapter>,
    );
    let auth = Arc::new(AuthManager::new(clients.clone(), Duration::from_secs(3600)));
    let bus = Arc::new(EventBus::new());

    let topics: Arc<Mutex<Vec<String>>> = Arc::default();
    {
        let topics = Arc::clone(&topics);
        bus.subscribe("*", move |event: &Event| {
            topics.lock().unwrap().push(event.topic.clone());
            Ok(())
        });
    }

    let config = FeedConfig {
        selectors: vec!["1".to_string()],
        currency: "GBP".to_string(),
        poll_interval: Duration::from_millis(25),
    };
    let mut feed = PollFeed::new(
        "src",
        Arc::clone(&clients["src"]),
        auth,
        Arc::clone(&bus),
        config,
    );

    feed.start();
    tokio::time::sleep(Duration::from_millis(90)).await;
    feed.stop().await;

    let topics = topics.lock().unwrap().clone();
    assert_eq!(
        &topics[..4],
        &[
            "odds.src".to_string(),
            "feed.started.src".to_string(),
            "feed.error.src".to_string(),
            "odds.src".to_string(),
        ]
    );
    assert_eq!(topics.last().map(String::as_str), Some("feed.stopped.src"));
}
