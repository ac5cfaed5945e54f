//! End-to-end store scenarios: snapshot isolation, conflict detection,
//! delete/reinsert lifecycles, and visibility-filtered similarity reads.

use std::collections::HashSet;

use memvex::{DistanceMetric, EmbedderConfig, Error, StoreConfig, TxnId, VersionedStore};

fn store() -> VersionedStore {
    let config = StoreConfig {
        embedder: EmbedderConfig::new("feature-hash-v1", 512, DistanceMetric::Cosine).unwrap(),
        query_k: 2,
    };
    VersionedStore::with_config(&config).unwrap()
}

/// Everything visible to `txn` as `(id, version_key, value)` triples
fn visible(store: &VersionedStore, txn: TxnId) -> Vec<(String, String, String)> {
    store
        .read(txn, "", usize::MAX)
        .unwrap()
        .into_iter()
        .map(|v| {
            (
                v.id().to_string(),
                v.version_key().to_string(),
                v.value().to_string(),
            )
        })
        .collect()
}

#[test]
fn snapshot_isolation_basic() {
    let store = store();

    // T1: insert A and commit
    let t1 = store.begin();
    store.insert(t1, "A", "mock A").unwrap();
    store.commit(t1).unwrap();

    // T2: insert B and commit
    let t2 = store.begin();
    store.insert(t2, "B", "mock B").unwrap();
    store.commit(t2).unwrap();

    // T3: update A, do NOT commit
    let t3 = store.begin();
    store.update(t3, "A", "mock A2").unwrap();

    // T4: sees the committed state only; A_3 is invisible while T3 is live
    let t4 = store.begin();
    let mut seen = visible(&store, t4);
    seen.sort();
    assert_eq!(
        seen,
        vec![
            ("A".to_string(), "A_1".to_string(), "mock A".to_string()),
            ("B".to_string(), "B_2".to_string(), "mock B".to_string()),
        ]
    );

    // After T3 commits, a fresh transaction sees the new version
    store.commit(t3).unwrap();
    let t5 = store.begin();
    let mut seen = visible(&store, t5);
    seen.sort();
    assert_eq!(
        seen,
        vec![
            ("A".to_string(), "A_3".to_string(), "mock A2".to_string()),
            ("B".to_string(), "B_2".to_string(), "mock B".to_string()),
        ]
    );
}

#[test]
fn snapshot_stability_across_foreign_commits() {
    let store = store();

    let t1 = store.begin();
    store.insert(t1, "A", "mock A").unwrap();
    store.commit(t1).unwrap();
    let t2 = store.begin();
    store.insert(t2, "B", "mock B").unwrap();
    store.commit(t2).unwrap();

    let t3 = store.begin();
    store.update(t3, "A", "mock A2").unwrap();

    let t4 = store.begin();
    let before = visible(&store, t4);

    // T3 commits between two reads from T4; the snapshot must not move
    store.commit(t3).unwrap();
    let after = visible(&store, t4);
    assert_eq!(before, after);
    assert!(after.iter().any(|(_, key, _)| key == "A_1"));
}

#[test]
fn duplicate_insert_is_rejected() {
    let store = store();

    let t1 = store.begin();
    store.insert(t1, "A", "first").unwrap();
    store.commit(t1).unwrap();

    let t2 = store.begin();
    let err = store.insert(t2, "A", "second").unwrap_err();
    assert!(matches!(err, Error::AlreadyExists { .. }));
}

#[test]
fn write_write_conflict_first_committer_wins() {
    let store = store();

    let t0 = store.begin();
    store.insert(t0, "A", "orig").unwrap();
    store.commit(t0).unwrap();

    let t1 = store.begin();
    let t2 = store.begin();

    store.update(t1, "A", "v1").unwrap();
    store.commit(t1).unwrap();

    // T1 already committed, so T2 waits for nothing; its snapshot still
    // points at A_1 while the head moved to A_2 (= A_{t1})
    let err = store.update(t2, "A", "v2").unwrap_err();
    assert!(err.is_conflict());
    match err {
        Error::WriteConflict { snapshot_key, head_key, .. } => {
            assert_eq!(snapshot_key, format!("A_{}", t0));
            assert_eq!(head_key, format!("A_{}", t1));
        }
        other => panic!("expected WriteConflict, got {:?}", other),
    }
}

#[test]
fn delete_then_reinsert_lifecycle() {
    let store = store();

    let t1 = store.begin();
    store.insert(t1, "A", "old").unwrap();
    store.commit(t1).unwrap();

    // Tm begins before the delete commits; its snapshot keeps pre-delete A
    let tm = store.begin();

    let t2 = store.begin();
    store.delete(t2, "A").unwrap();
    store.commit(t2).unwrap();

    let t3 = store.begin();
    store.insert(t3, "A", "new").unwrap();
    store.commit(t3).unwrap();

    let t4 = store.begin();
    assert_eq!(
        visible(&store, t4),
        vec![("A".to_string(), format!("A_{}", t3), "new".to_string())]
    );
    assert_eq!(
        visible(&store, tm),
        vec![("A".to_string(), format!("A_{}", t1), "old".to_string())]
    );
}

#[test]
fn vector_filter_returns_closest_visible_versions() {
    let store = store();

    let t1 = store.begin();
    store.insert(t1, "doc1", "dog").unwrap();
    store.insert(t1, "doc2", "ducks like to eat bread").unwrap();
    store.insert(t1, "doc3", "i have a cute dog").unwrap();
    store.commit(t1).unwrap();

    let t2 = store.begin();
    let top = store.read(t2, "cute dogs", 2).unwrap();
    let ids: HashSet<&str> = top.iter().map(|v| v.id()).collect();
    assert_eq!(ids, HashSet::from(["doc1", "doc3"]));

    // doc2 is never ranked first even when everything is returned
    let all = store.read(t2, "cute dogs", 10).unwrap();
    assert_eq!(all.len(), 3);
    assert_ne!(all[0].id(), "doc2");
}

#[test]
fn pre_update_snapshot_ignores_in_flight_update() {
    let store = store();

    let t1 = store.begin();
    store.insert(t1, "doc1", "dog").unwrap();
    store.insert(t1, "doc2", "ducks like to eat bread").unwrap();
    store.commit(t1).unwrap();

    // Reader's snapshot predates the uncommitted update
    let reader = store.begin();

    let updater = store.begin();
    store.update(updater, "doc1", "cute dog").unwrap();

    let results = store.read(reader, "cute dogs", 2).unwrap();
    let doc1 = results.iter().find(|v| v.id() == "doc1").unwrap();
    assert_eq!(doc1.value(), "dog");
    assert_eq!(doc1.version_key(), format!("doc1_{}", t1));
}

// === Round-trip laws ===

#[test]
fn insert_commit_read_round_trip() {
    let store = store();

    let t1 = store.begin();
    store.insert(t1, "A", "payload").unwrap();
    store.commit(t1).unwrap();

    let t2 = store.begin();
    assert_eq!(
        visible(&store, t2),
        vec![("A".to_string(), "A_1".to_string(), "payload".to_string())]
    );
}

#[test]
fn insert_abort_read_returns_nothing() {
    let store = store();

    let t1 = store.begin();
    store.insert(t1, "A", "payload").unwrap();
    store.abort(t1).unwrap();

    let t2 = store.begin();
    assert!(visible(&store, t2).is_empty());
}

#[test]
fn replayed_update_against_same_snapshot_conflicts_without_chain_change() {
    let store = store();

    let t0 = store.begin();
    store.insert(t0, "A", "base").unwrap();
    store.commit(t0).unwrap();

    // Two transactions with the same snapshot of A
    let ta = store.begin();
    let tb = store.begin();

    store.update(ta, "A", "applied").unwrap();
    store.commit(ta).unwrap();

    let chain_before: Vec<String> = store
        .chain("A")
        .iter()
        .map(|v| v.version_key().to_string())
        .collect();

    // The replay of the same logical update fails and mutates nothing
    let err = store.update(tb, "A", "applied").unwrap_err();
    assert!(err.is_conflict());

    let chain_after: Vec<String> = store
        .chain("A")
        .iter()
        .map(|v| v.version_key().to_string())
        .collect();
    assert_eq!(chain_before, chain_after);
}
