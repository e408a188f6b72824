//! Integration tests for persistent collections
//!
//! Tests LtVec and LtMap immutability and structural sharing.

use std::sync::Arc;

use tessera_foundation::{LtMap, LtVec, Value};

#[test]
fn vector_push_back_leaves_original() {
    let v1 = LtVec::new().push_back(Value::Int(1));
    let v2 = v1.push_back(Value::Int(2));

    assert_eq!(v1.len(), 1);
    assert_eq!(v2.len(), 2);
    assert_eq!(v2.get(1), Some(&Value::Int(2)));
}

#[test]
fn map_insert_and_remove() {
    let m1: LtMap<Arc<str>, Value> = LtMap::new();
    let m2 = m1.insert(Arc::from("a"), Value::Int(1));
    let m3 = m2.insert(Arc::from("b"), Value::Int(2));
    let m4 = m3.remove("a");

    assert!(m1.is_empty());
    assert_eq!(m3.len(), 2);
    assert!(m3.contains_key("a"));
    assert!(!m4.contains_key("a"));
    assert_eq!(m4.get("b"), Some(&Value::Int(2)));
}

#[test]
fn map_iterates_in_key_order() {
    let m: LtMap<Arc<str>, Value> = [("c", 3), ("a", 1), ("b", 2)]
        .into_iter()
        .map(|(k, v)| (Arc::from(k), Value::Int(v)))
        .collect();
    let keys: Vec<&str> = m.keys().map(|k| &**k).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
}
