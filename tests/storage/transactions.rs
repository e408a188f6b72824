//! Integration tests for transaction limits, isolation and concurrency

use std::thread;

use tessera_foundation::{ErrorKind, Value};
use tessera_storage::{Engine, KvRead, Store, StoreOptions, always};

use crate::engine;

#[test]
fn oversized_transaction_commits_nothing() {
    let store = Store::in_memory_with(StoreOptions::in_memory().with_max_txn_entries(5)).unwrap();
    let engine = Engine::new(store);
    let fields: Vec<(String, Value)> = (0..10).map(|i| (format!("f{i}"), Value::Int(i))).collect();

    let err = engine.insert("t", fields).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TransactionTooLarge { limit: 5 }));
    assert!(engine.store().is_empty().unwrap());
}

#[test]
fn oversized_value_is_rejected() {
    let store = Store::in_memory_with(StoreOptions::in_memory().with_max_value_bytes(64)).unwrap();
    let engine = Engine::new(store);

    let err = engine.insert("t", [("blob", "x".repeat(1_000))]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ValueTooLarge { limit: 64, .. }));
    assert!(engine.store().is_empty().unwrap());
}

#[test]
fn snapshots_do_not_see_later_writes() {
    let engine = engine();
    engine.insert("t", [("n", 1)]).unwrap();
    let snapshot = engine.store().begin_read().unwrap();

    engine.insert("t", [("n", 2)]).unwrap();

    let visible = snapshot.scan_prefix(b"entities.").count();
    assert_eq!(visible, 1);
    assert_eq!(engine.select("t", always()).unwrap().len(), 2);
}

#[test]
fn concurrent_inserts_all_land() {
    let engine = engine();
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let engine = engine.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    engine
                        .insert("job", [("worker", Value::Int(worker)), ("i", Value::Int(i))])
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.select("job", always()).unwrap().len(), 100);
}

#[test]
fn concurrent_edits_of_one_entity_conflict() {
    let engine = engine();
    let e = engine.insert("t", [("n", 0)]).unwrap();

    let mut first = engine.store().begin_write().unwrap();
    let mut second = engine.store().begin_write().unwrap();
    let key = tessera_storage::keys::component(e.id(), "n");

    assert!(first.get(&key).unwrap().is_some());
    assert!(second.get(&key).unwrap().is_some());
    first.set(key.clone(), b"a".as_slice()).unwrap();
    second.set(key, b"b".as_slice()).unwrap();

    first.commit().unwrap();
    let err = second.commit().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TransactionConflict));
}

#[test]
fn closed_store_rejects_everything() {
    let engine = engine();
    engine.insert("t", [("n", 1)]).unwrap();
    engine.store().close().unwrap();
    engine.store().close().unwrap();

    assert!(engine.store().is_closed());
    for err in [
        engine.insert("t", [("n", 2)]).unwrap_err(),
        engine.select("t", always()).unwrap_err(),
    ] {
        assert!(matches!(err.kind, ErrorKind::StoreClosed));
    }
}
