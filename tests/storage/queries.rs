//! Integration tests for select, delete-all and update-all

use std::time::Duration;

use tessera_foundation::{Entity, Error, ErrorKind, Result, Value};
use tessera_storage::{Engine, EngineOptions, Store, always, callback};

use crate::{all_keys, engine};

fn people() -> Engine {
    let engine = engine();
    for (name, age) in [("Ana", 30), ("Bo", 17), ("Cy", 45), ("Di", 12)] {
        engine
            .insert("person", [("name", Value::from(name)), ("age", Value::Int(age))])
            .unwrap();
    }
    engine
}

fn minor(e: &Entity) -> Result<Value> {
    Ok(Value::Bool(e.get("age").and_then(Value::as_int) < Some(18)))
}

fn names(entities: &[Entity]) -> Vec<String> {
    let mut names: Vec<String> = entities
        .iter()
        .filter_map(|e| e.get("name").and_then(Value::as_str).map(str::to_owned))
        .collect();
    names.sort();
    names
}

// =============================================================================
// Select
// =============================================================================

#[test]
fn select_filters_by_predicate() {
    let engine = people();
    assert_eq!(names(&engine.select("person", minor).unwrap()), vec!["Bo", "Di"]);
}

#[test]
fn failing_or_non_boolean_predicates_match_nothing() {
    let engine = people();
    let failing = engine
        .select("person", callback(|_| Err(Error::callback("boom"))))
        .unwrap();
    assert!(failing.is_empty());

    let non_bool = engine
        .select("person", callback(|_| Ok(Value::Int(1))))
        .unwrap();
    assert!(non_bool.is_empty());
}

#[test]
fn stateful_predicate() {
    let engine = people();
    let mut seen = 0;
    let first_two = engine
        .select(
            "person",
            callback(|_| {
                seen += 1;
                Ok(Value::Bool(seen <= 2))
            }),
        )
        .unwrap();
    assert_eq!(first_two.len(), 2);
    assert_eq!(seen, 4);
}

// =============================================================================
// Delete All
// =============================================================================

#[test]
fn delete_all_removes_matches() {
    let engine = people();
    assert_eq!(engine.delete_all("person", minor).unwrap(), 2);
    assert_eq!(names(&engine.select("person", always()).unwrap()), vec!["Ana", "Cy"]);
    assert_eq!(engine.delete_all("person", minor).unwrap(), 0);
}

#[test]
fn delete_all_then_nothing_left() {
    let engine = people();
    assert_eq!(engine.delete_all("person", always()).unwrap(), 4);
    assert!(engine.store().is_empty().unwrap());
}

// =============================================================================
// Update All
// =============================================================================

#[test]
fn update_all_patches_matches() {
    let engine = people();
    let n = engine
        .update_all(
            "person",
            callback(|_| Ok(Value::map([("guardian", Value::Bool(true))]))),
            minor,
        )
        .unwrap();
    assert_eq!(n, 2);

    let guarded = engine
        .select("person", callback(|e| Ok(Value::Bool(e.get("guardian").is_some()))))
        .unwrap();
    assert_eq!(names(&guarded), vec!["Bo", "Di"]);
}

#[test]
fn update_all_is_idempotent() {
    let engine = people();
    let mapper = || callback(|_| Ok(Value::map([("status", "checked")])));

    let first = engine.update_all("person", mapper(), always()).unwrap();
    let after_first = engine.select("person", always()).unwrap();
    let second = engine.update_all("person", mapper(), always()).unwrap();
    let after_second = engine.select("person", always()).unwrap();

    assert_eq!(first, second);
    assert_eq!(after_first, after_second);
}

#[test]
fn update_all_can_read_the_entity() {
    let engine = people();
    engine
        .update_all(
            "person",
            callback(|e| {
                let age = e.get("age").and_then(Value::as_int).unwrap_or(0);
                Ok(Value::map([("age", age + 1)]))
            }),
            always(),
        )
        .unwrap();
    let ages: Vec<i64> = engine
        .select("person", always())
        .unwrap()
        .iter()
        .filter_map(|e| e.get("age").and_then(Value::as_int))
        .collect();
    let mut sorted = ages.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![13, 18, 31, 46]);
}

#[test]
fn update_all_ignores_id_in_patch() {
    let engine = people();
    let before: Vec<_> = engine
        .select("person", always())
        .unwrap()
        .iter()
        .map(|e| e.id().clone())
        .collect();
    engine
        .update_all(
            "person",
            callback(|_| Ok(Value::map([("id", "hijacked"), ("x", "y")]))),
            always(),
        )
        .unwrap();
    let after: Vec<_> = engine
        .select("person", always())
        .unwrap()
        .iter()
        .map(|e| e.id().clone())
        .collect();
    assert_eq!(before, after);
}

#[test]
fn non_map_patch_rolls_back() {
    let engine = people();
    let mut calls = 0;
    let err = engine
        .update_all(
            "person",
            callback(|_| {
                calls += 1;
                if calls == 1 {
                    Ok(Value::map([("touched", true)]))
                } else {
                    Ok(Value::Int(7))
                }
            }),
            always(),
        )
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));

    let touched = engine
        .select("person", callback(|e| Ok(Value::Bool(e.get("touched").is_some()))))
        .unwrap();
    assert!(touched.is_empty());
}

#[test]
fn invalid_patch_field_names_roll_back() {
    for bad in ["a\0b", ""] {
        let engine = people();
        let before = all_keys(&engine);
        let err = engine
            .update_all(
                "person",
                callback(move |_| Ok(Value::map([("age", Value::Int(99)), (bad, Value::Int(2))]))),
                always(),
            )
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidArgument(_)), "{bad:?}");
        assert_eq!(all_keys(&engine), before, "{bad:?}");
        let patched = callback(|e| Ok(Value::Bool(e.get("age") == Some(&Value::Int(99)))));
        assert!(engine.select("person", patched).unwrap().is_empty());
    }
}

#[test]
fn id_only_patch_counts_matches_without_writing() {
    let engine = people();
    let before = all_keys(&engine);
    let count = engine
        .update_all(
            "person",
            callback(|_| Ok(Value::map([("id", "ignored")]))),
            minor,
        )
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(all_keys(&engine), before);
}

#[test]
fn callback_writing_into_scanned_tag_conflicts() {
    let engine = people();
    let originals = names(&engine.select("person", always()).unwrap());

    let inner = engine.clone();
    let mut inserted = false;
    let err = engine
        .delete_all(
            "person",
            callback(move |_| {
                if !inserted {
                    inner.insert("person", [("name", "Eve")])?;
                    inserted = true;
                }
                Ok(Value::Bool(true))
            }),
        )
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TransactionConflict));

    let mut expected = originals.clone();
    expected.push("Eve".to_owned());
    assert_eq!(names(&engine.select("person", always()).unwrap()), expected);

    let inner = engine.clone();
    let mut inserted = false;
    let err = engine
        .update_all(
            "person",
            callback(|_| Ok(Value::map([("touched", true)]))),
            callback(move |_| {
                if !inserted {
                    inner.insert("person", [("name", "Fay")])?;
                    inserted = true;
                }
                Ok(Value::Bool(true))
            }),
        )
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TransactionConflict));
    let touched = engine
        .select("person", callback(|e| Ok(Value::Bool(e.get("touched").is_some()))))
        .unwrap();
    assert!(touched.is_empty());
}

// =============================================================================
// Deadlines
// =============================================================================

#[test]
fn slow_scans_time_out() {
    let store = Store::in_memory().unwrap();
    let engine = Engine::with_options(
        store.clone(),
        EngineOptions::new().with_scan_deadline(Duration::from_millis(50)),
    );
    for i in 0..3 {
        engine.insert("slow", [("n", i)]).unwrap();
    }

    let err = engine
        .select(
            "slow",
            callback(|_| {
                std::thread::sleep(Duration::from_millis(60));
                Ok(Value::Bool(true))
            }),
        )
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Timeout(_)));

    // Fast scans still complete.
    assert_eq!(engine.select("slow", always()).unwrap().len(), 3);
}
