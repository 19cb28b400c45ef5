// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::auth::ProviderMap;
use ovr_adapters::{AuthOutcome, FakeProvider, ProviderAdapter, SnapshotOutcome};
use ovr_core::Outcome;
use std::time::Duration;
use tempfile::tempdir;

fn market(id: &str, event: &str) -> Market {
    let mut market = Market::new(id, "Match Odds", event, "alpha");
    market.outcomes.push(Outcome::new("Home", 2.0, "alpha"));
    market
}

fn runner_for(providers: &[FakeProvider], root: &std::path::Path) -> HarvestRunner {
    let clients: ProviderMap = providers
        .iter()
        .map(|p| {
            (
                p.name().to_string(),
                Arc::new(p.clone()) as Arc<dyn ProviderAdapter>,
            )
        })
        .collect();
    let auth = Arc::new(AuthManager::new(clients, Duration::from_secs(3600)));
    HarvestRunner::new(
        auth,
        FileStore::new(root),
        vec!["1".to_string()],
        "soccer",
    )
}

#[yare::parameterized(
    simple     = { "Man Utd vs Chelsea", "man-utd-vs-chelsea" },
    punctuated = { "Brighton & Hove Albion", "brighton-hove-albion" },
    padded     = { "  FC Zürich  ", "fc-z-rich" },
    empty      = { "—", "unknown" },
)]
fn slugs(event: &str, expected: &str) {
    assert_eq!(slug(event), expected);
}

#[test]
fn record_mapping_carries_payload_fields() {
    let market = market("1.23", "Man Utd vs Chelsea");
    let record = record_from_market(&market, "soccer", "2026-08-01");

    assert_eq!(record.id, "1.23");
    assert_eq!(record.source, "alpha");
    assert_eq!(record.sport, "soccer");
    assert_eq!(record.competition, "man-utd-vs-chelsea");
    assert_eq!(record.captured_on, "2026-08-01");
    assert_eq!(record.extra["market_name"], "Match Odds");
    assert_eq!(record.extra["event_name"], "Man Utd vs Chelsea");
    assert_eq!(record.extra["outcomes"][0]["name"], "Home");
}

#[tokio::test]
async fn batch_fetches_and_stores_per_source() {
    let dir = tempdir().unwrap();
    let alpha = FakeProvider::new("alpha");
    alpha.push_snapshot(SnapshotOutcome::Markets(vec![
        market("1.1", "A vs B"),
        market("1.2", "C vs D"),
    ]));
    let beta = FakeProvider::new("beta");
    beta.push_snapshot(SnapshotOutcome::Markets(vec![market("2.1", "A vs B")]));

    let runner = runner_for(&[alpha, beta], dir.path());
    let stats = runner.run_batch().await.unwrap();

    assert_eq!(stats.records_fetched, 3);
    assert_eq!(stats.records_written, 3);
    assert_eq!(stats.sources_ok, 2);
    assert_eq!(stats.sources_failed, 0);

    let a_vs_b = dir
        .path()
        .join("markets/soccer/a-vs-b/")
        .read_dir()
        .unwrap()
        .count();
    assert_eq!(a_vs_b, 1);
}

#[tokio::test]
async fn repeated_batches_dedup_by_identity() {
    let dir = tempdir().unwrap();
    let alpha = FakeProvider::new("alpha");
    let snapshot = vec![market("1.1", "A vs B"), market("1.2", "A vs B")];
    alpha.push_snapshot(SnapshotOutcome::Markets(snapshot.clone()));
    alpha.push_snapshot(SnapshotOutcome::Markets(snapshot));

    let runner = runner_for(&[alpha], dir.path());

    let first = runner.run_batch().await.unwrap();
    assert_eq!(first.records_written, 2);

    let second = runner.run_batch().await.unwrap();
    assert_eq!(second.records_fetched, 2);
    assert_eq!(second.records_written, 0);
}

#[tokio::test]
async fn failing_source_does_not_abort_the_batch() {
    let dir = tempdir().unwrap();
    let alpha = FakeProvider::new("alpha");
    alpha.push_snapshot(SnapshotOutcome::Error("upstream 500".to_string()));
    let beta = FakeProvider::new("beta");
    beta.push_snapshot(SnapshotOutcome::Markets(vec![market("2.1", "A vs B")]));

    let runner = runner_for(&[alpha, beta], dir.path());
    let stats = runner.run_batch().await.unwrap();

    assert_eq!(stats.sources_failed, 1);
    assert_eq!(stats.sources_ok, 1);
    assert_eq!(stats.records_written, 1);
}

#[tokio::test]
async fn unauthenticated_source_counts_as_failed() {
    let dir = tempdir().unwrap();
    let alpha = FakeProvider::new("alpha");
    alpha.push_auth(AuthOutcome::Refused);
    let beta = FakeProvider::new("beta");
    beta.push_snapshot(SnapshotOutcome::Markets(vec![market("2.1", "A vs B")]));

    let runner = runner_for(&[alpha, beta], dir.path());
    let stats = runner.run_batch().await.unwrap();

    assert_eq!(stats.sources_failed, 1);
    assert_eq!(stats.sources_ok, 1);
}
