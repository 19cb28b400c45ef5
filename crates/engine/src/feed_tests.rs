// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ovr_adapters::{AuthOutcome, FakeProvider, SnapshotOutcome};
use ovr_core::{Event, Market, Outcome};
use parking_lot::Mutex;

const FAST_POLL: Duration = Duration::from_millis(25);

type Topics = Arc<Mutex<Vec<String>>>;

struct Rig {
    provider: FakeProvider,
    bus: Arc<EventBus>,
    topics: Topics,
    feed: PollFeed,
}

fn rig(provider: FakeProvider) -> Rig {
    let name = provider.name().to_string();
    let mut clients: ProviderMap = HashMap::new();
    clients.insert(
        name.clone(),
        Arc::new(provider.clone()) as Arc<dyn ProviderAdapter>,
    );
    let auth = Arc::new(AuthManager::new(clients.clone(), Duration::from_secs(3600)));
    let bus = Arc::new(EventBus::new());

    let topics: Topics = Topics::default();
    {
        let topics = Arc::clone(&topics);
        bus.subscribe("*", move |event: &Event| {
            topics.lock().push(event.topic.clone());
            Ok(())
        });
    }

    let config = FeedConfig {
        selectors: vec!["1".to_string()],
        currency: "GBP".to_string(),
        poll_interval: FAST_POLL,
    };
    let adapter = Arc::clone(&clients[&name]);
    let feed = PollFeed::new(name, adapter, auth, Arc::clone(&bus), config);
    Rig {
        provider,
        bus,
        topics,
        feed,
    }
}

fn market() -> Market {
    let mut market = Market::new("1.1", "Match Odds", "A vs B", "src");
    market.outcomes.push(Outcome::new("A", 2.5, "src"));
    market
}

#[tokio::test]
async fn first_successful_poll_publishes_odds_then_started() {
    let provider = FakeProvider::new("src");
    provider.set_authenticated(true);
    provider.push_snapshot(SnapshotOutcome::Markets(vec![market()]));
    let mut rig = rig(provider);

    rig.feed.start();
    tokio::time::sleep(Duration::from_millis(10)).await;
    rig.feed.stop().await;

    let topics = rig.topics.lock().clone();
    assert_eq!(topics[0], "odds.src");
    assert_eq!(topics[1], "feed.started.src");
    // started is published once per episode, not per poll.
    assert_eq!(
        topics.iter().filter(|t| *t == "feed.started.src").count(),
        1
    );
}

#[tokio::test]
async fn poll_error_is_published_and_the_loop_recovers() {
    let provider = FakeProvider::new("src");
    provider.set_authenticated(true);
    provider.push_snapshot(SnapshotOutcome::Markets(vec![market()]));
    provider.push_snapshot(SnapshotOutcome::Error("upstream 500".to_string()));
    provider.push_snapshot(SnapshotOutcome::Markets(vec![market()]));
    let mut rig = rig(provider);

    rig.feed.start();
    tokio::time::sleep(FAST_POLL * 4).await;
    rig.feed.stop().await;

    let topics = rig.topics.lock().clone();
    assert_eq!(
        &topics[..4],
        &[
            "odds.src".to_string(),
            "feed.started.src".to_string(),
            "feed.error.src".to_string(),
            "odds.src".to_string(),
        ]
    );
}

#[tokio::test]
async fn failed_poll_publishes_no_snapshot() {
    let provider = FakeProvider::new("src");
    provider.set_authenticated(true);
    provider.push_snapshot(SnapshotOutcome::Error("boom".to_string()));
    let mut rig = rig(provider);

    rig.feed.start();
    tokio::time::sleep(Duration::from_millis(10)).await;
    rig.feed.stop().await;

    let topics = rig.topics.lock().clone();
    assert!(topics.contains(&"feed.error.src".to_string()));
    assert!(!topics.iter().any(|t| t.starts_with("odds.")));
    assert!(!topics.contains(&"feed.started.src".to_string()));
}

#[tokio::test]
async fn error_payload_carries_the_message() {
    let provider = FakeProvider::new("src");
    provider.set_authenticated(true);
    provider.push_snapshot(SnapshotOutcome::Error("upstream 500".to_string()));
    let mut rig = rig(provider);

    let errors: Arc<Mutex<Vec<String>>> = Arc::default();
    {
        let errors = Arc::clone(&errors);
        rig.bus.subscribe("feed.error.*", move |event: &Event| {
            if let Some(message) = event.payload.error_message() {
                errors.lock().push(message.to_string());
            }
            Ok(())
        });
    }

    rig.feed.start();
    tokio::time::sleep(Duration::from_millis(10)).await;
    rig.feed.stop().await;

    let errors = errors.lock().clone();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("upstream 500"));
}

#[tokio::test]
async fn stale_session_is_refreshed_before_polling() {
    let provider = FakeProvider::new("src");
    // Starts unauthenticated; the pre-poll check re-auths via the manager.
    let mut rig = rig(provider.clone());

    rig.feed.start();
    tokio::time::sleep(Duration::from_millis(10)).await;
    rig.feed.stop().await;

    assert!(provider.auth_count() >= 1);
    let topics = rig.topics.lock().clone();
    assert_eq!(topics[0], "odds.src");
}

#[tokio::test]
async fn failed_reauth_surfaces_as_feed_error_and_does_not_kill_the_loop() {
    let provider = FakeProvider::new("src");
    provider.push_auth(AuthOutcome::Refused);
    let mut rig = rig(provider.clone());

    rig.feed.start();
    tokio::time::sleep(FAST_POLL * 3).await;
    assert!(rig.feed.is_running());
    rig.feed.stop().await;

    let topics = rig.topics.lock().clone();
    assert_eq!(topics[0], "feed.error.src");
    // The next cycle re-authenticated successfully and polled.
    assert!(topics.contains(&"odds.src".to_string()));
}

#[tokio::test]
async fn snapshots_are_stamped_with_source_and_currency() {
    let provider = FakeProvider::new("src");
    provider.set_authenticated(true);
    let mut foreign = market();
    foreign.source = "raw".to_string();
    provider.push_snapshot(SnapshotOutcome::Markets(vec![foreign]));
    let mut rig = rig(provider);

    let seen: Arc<Mutex<Vec<Market>>> = Arc::default();
    {
        let seen = Arc::clone(&seen);
        rig.bus.subscribe("odds.*", move |event: &Event| {
            seen.lock()
                .extend(event.payload.markets().unwrap_or(&[]).to_vec());
            Ok(())
        });
    }

    rig.feed.start();
    tokio::time::sleep(Duration::from_millis(10)).await;
    rig.feed.stop().await;

    let seen = seen.lock().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].source, "src");
    assert_eq!(seen[0].currency, "GBP");
    assert_eq!(seen[0].outcomes[0].source, "src");
    assert_eq!(seen[0].outcomes[0].currency, "GBP");
}

#[tokio::test]
async fn reentrant_start_is_a_noop() {
    let provider = FakeProvider::new("src");
    provider.set_authenticated(true);
    let mut rig = rig(provider);

    rig.feed.start();
    assert!(rig.feed.is_running());
    rig.feed.start();
    assert!(rig.feed.is_running());

    rig.feed.stop().await;
    assert!(!rig.feed.is_running());
}

#[tokio::test]
async fn stop_is_idempotent_and_publishes_stopped() {
    let provider = FakeProvider::new("src");
    provider.set_authenticated(true);
    let mut rig = rig(provider);

    rig.feed.start();
    tokio::time::sleep(Duration::from_millis(10)).await;
    rig.feed.stop().await;
    rig.feed.stop().await;

    let topics = rig.topics.lock().clone();
    assert!(topics.contains(&"feed.stopped.src".to_string()));
    assert!(!rig.feed.is_running());
}

#[tokio::test]
async fn manager_runs_one_feed_per_source() {
    let alpha = FakeProvider::new("alpha");
    alpha.set_authenticated(true);
    let beta = FakeProvider::new("beta");
    beta.set_authenticated(true);

    let mut clients: ProviderMap = HashMap::new();
    for provider in [&alpha, &beta] {
        clients.insert(
            provider.name().to_string(),
            Arc::new(provider.clone()) as Arc<dyn ProviderAdapter>,
        );
    }
    let auth = Arc::new(AuthManager::new(clients.clone(), Duration::from_secs(3600)));
    let bus = Arc::new(EventBus::new());
    let currencies =
        HashMap::from([("alpha".to_string(), "GBP".to_string())]);

    let mut manager = FeedManager::new(
        clients,
        auth,
        bus,
        vec!["1".to_string()],
        &currencies,
        FAST_POLL,
    );

    manager.start_all();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let status = manager.status();
    assert_eq!(status.len(), 2);
    assert!(status.values().all(|running| *running));

    manager.stop_all().await;
    assert!(manager.status().values().all(|running| !*running));
    assert!(alpha.snapshot_count() >= 1);
    assert!(beta.snapshot_count() >= 1);
}
