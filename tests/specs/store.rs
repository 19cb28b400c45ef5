// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deduplication and concurrency of the flat-file store.

use std::collections::BTreeSet;

use ovr_core::HarvestRecord;
use ovr_storage::FileStore;
use tempfile::tempdir;

fn record(id: &str) -> HarvestRecord {
    HarvestRecord {
        id: id.to_string(),
        source: "alpha".to_string(),
        sport: "soccer".to_string(),
        competition: "premier-league".to_string(),
        captured_on: "2026-08-01".to_string(),
        extra: serde_json::Map::new(),
    }
}

fn stored_ids(store: &FileStore) -> BTreeSet<String> {
    let path = store.resolve_path(&record("probe"));
    let raw = std::fs::read_to_string(path).unwrap();
    let values: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
    values
        .iter()
        .map(|v| v["id"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn identical_snapshots_across_batches_store_once() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let batch = vec![record("A"), record("B")];

    assert_eq!(store.save(&batch), 2);
    assert_eq!(store.save(&batch), 0);

    assert_eq!(stored_ids(&store).len(), 2);
}

#[test]
fn reloaded_ids_are_the_union_of_all_saves() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path());

    store.save(&[record("A"), record("B")]);
    store.save(&[record("B"), record("C")]);
    store.save(&[record("D")]);

    let want: BTreeSet<String> = ["A", "B", "C", "D"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(stored_ids(&store), want);
}

#[test]
fn concurrent_saves_to_one_destination_keep_every_record() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path());

    let first = store.clone();
    let second = store.clone();
    let a = std::thread::spawn(move || {
        first.save(&[record("a1"), record("a2"), record("a3")])
    });
    let b = std::thread::spawn(move || {
        second.save(&[record("b1"), record("b2"), record("b3")])
    });

    let written = a.join().unwrap() + b.join().unwrap();
    assert_eq!(written, 6);

    let want: BTreeSet<String> = ["a1", "a2", "a3", "b1", "b2", "b3"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(stored_ids(&store), want);
}
