//! Integration tests for reopening persisted stores

use std::path::Path;

use tessera_foundation::{ErrorKind, Value};
use tessera_storage::{Engine, Store, StoreOptions, always};

fn open(dir: &Path) -> Engine {
    Engine::new(Store::open(StoreOptions::persistent(dir)).unwrap())
}

#[test]
fn state_survives_clean_restart() {
    let dir = tempfile::tempdir().unwrap();

    let engine = open(dir.path());
    let a = engine.insert(["user", "admin"], [("name", "A")]).unwrap();
    let b = engine.insert("user", [("name", "B")]).unwrap();
    engine
        .link(&a, &b, "belongs", "friends", Some(Value::map([("years", 10)])))
        .unwrap();
    engine.store().close().unwrap();

    let engine = open(dir.path());
    assert_eq!(engine.get(&a).unwrap().unwrap(), a);
    assert_eq!(engine.tags_of(&a).unwrap(), vec!["admin", "user"]);
    assert_eq!(
        engine.relationships_of(&b, "has", "friends").unwrap(),
        vec![Value::map([("years", 10)])]
    );
}

#[test]
fn commits_survive_without_close() {
    let dir = tempfile::tempdir().unwrap();

    let id = {
        let engine = open(dir.path());
        let doomed = engine.insert("t", [("n", 1)]).unwrap();
        let kept = engine.insert("t", [("n", 2)]).unwrap();
        engine.delete(&doomed).unwrap();
        kept.id().clone()
    };

    let engine = open(dir.path());
    let all = engine.select("t", always()).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id(), &id);
}

#[test]
fn live_store_cannot_be_opened_twice() {
    let dir = tempfile::tempdir().unwrap();

    let engine = open(dir.path());
    engine.insert("t", [("n", 1)]).unwrap();
    let err = Store::open(StoreOptions::persistent(dir.path())).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Io(_)));

    engine.store().close().unwrap();
    let engine = open(dir.path());
    assert_eq!(engine.select("t", always()).unwrap().len(), 1);
}

#[test]
fn rejected_insert_leaves_no_trace_after_restart() {
    let dir = tempfile::tempdir().unwrap();

    let engine = open(dir.path());
    engine.insert("t", [("n", 1)]).unwrap();
    let err = engine.insert("t", [("blob", "x".repeat(2 << 20))]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ValueTooLarge { .. }));
    engine.insert("t", [("n", 2)]).unwrap();
    drop(engine);

    let engine = open(dir.path());
    assert_eq!(engine.select("t", always()).unwrap().len(), 2);
}

#[test]
fn reopened_store_keeps_accepting_writes() {
    let dir = tempfile::tempdir().unwrap();

    let engine = open(dir.path());
    engine.insert("t", [("n", 1)]).unwrap();
    engine.store().close().unwrap();

    let engine = open(dir.path());
    engine.insert("t", [("n", 2)]).unwrap();
    drop(engine);

    let engine = open(dir.path());
    assert_eq!(engine.select("t", always()).unwrap().len(), 2);
}
