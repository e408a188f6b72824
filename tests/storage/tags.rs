//! Integration tests for the tag index

use tessera_foundation::{EntityId, ErrorKind, Value};
use tessera_storage::{TagSpec, always};

use crate::engine;

#[test]
fn tag_spec_conversions() {
    assert_eq!(TagSpec::from("a").len(), 1);
    assert_eq!(TagSpec::from(["a", "b"]).to_string(), "a,b");
    assert!(TagSpec::try_from(&Value::from(vec!["a", "b"])).is_ok());
    assert!(TagSpec::try_from(&Value::Int(1)).is_err());
    assert!(TagSpec::from(Vec::<String>::new()).validate().is_err());
}

#[test]
fn add_tag_makes_entity_selectable() {
    let engine = engine();
    let e = engine.insert("user", [("name", "A")]).unwrap();
    assert!(engine.select("vip", always()).unwrap().is_empty());

    engine.add_tag(["vip", "beta"], &e).unwrap();
    assert_eq!(engine.select("vip", always()).unwrap(), vec![e.clone()]);
    assert_eq!(engine.tags_of(&e).unwrap(), vec!["beta", "user", "vip"]);
}

#[test]
fn add_tag_is_idempotent() {
    let engine = engine();
    let e = engine.insert("user", [("name", "A")]).unwrap();
    engine.add_tag("user", &e).unwrap();
    assert_eq!(engine.select("user", always()).unwrap().len(), 1);
    assert_eq!(engine.tags_of(&e).unwrap(), vec!["user"]);
}

#[test]
fn add_tag_to_missing_entity_writes_nothing() {
    let engine = engine();
    let err = engine.add_tag("vip", EntityId::generate()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::EntityNotFound(_)));
    assert!(engine.store().is_empty().unwrap());
}

#[test]
fn tag_prefixes_do_not_collide() {
    let engine = engine();
    engine.insert("user", [("n", 1)]).unwrap();
    engine.insert("users", [("n", 2)]).unwrap();
    engine.insert("use", [("n", 3)]).unwrap();

    for (tag, n) in [("use", 3), ("user", 1), ("users", 2)] {
        let found = engine.select(tag, always()).unwrap();
        assert_eq!(found.len(), 1, "tag {tag}");
        assert_eq!(found[0].get("n"), Some(&Value::Int(n)));
    }
}

#[test]
fn unknown_tag_selects_nothing() {
    let engine = engine();
    engine.insert("user", [("n", 1)]).unwrap();
    assert!(engine.select("ghost", always()).unwrap().is_empty());
}

#[test]
fn bad_tag_name_is_rejected() {
    let engine = engine();
    assert!(engine.select("", always()).is_err());
    assert!(engine.insert("a\0b", [("n", 1)]).is_err());
}
