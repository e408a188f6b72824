//! Integration tests for entity ids and projections

use tessera_foundation::{Entity, EntityId, EntityRef, ErrorKind, ID_FIELD, Value};

#[test]
fn generated_ids_are_unique() {
    let a = EntityId::generate();
    let b = EntityId::generate();
    assert_ne!(a, b);
    assert!(!a.as_str().is_empty());
}

#[test]
fn parse_rejects_empty_and_nul() {
    assert!(EntityId::parse("").is_err());
    assert!(EntityId::parse("a\0b").is_err());
    assert_eq!(EntityId::parse("e1").unwrap().as_str(), "e1");
}

#[test]
fn projection_includes_id() {
    let id = EntityId::parse("e1").unwrap();
    let mut e = Entity::new(id.clone());
    e.set("name", "Pedro");

    let v = e.to_value();
    assert_eq!(v.get(ID_FIELD), Some(&Value::from("e1")));
    assert_eq!(v.get("name"), Some(&Value::from("Pedro")));
    assert_eq!(Entity::from_value(&v).unwrap(), e);
}

#[test]
fn from_value_requires_a_map() {
    let err = Entity::from_value(&Value::Int(1)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));
}

#[test]
fn entity_ref_resolves_ids_and_projections() {
    let id = EntityId::parse("e1").unwrap();
    assert_eq!(EntityRef::from("e1").resolve().unwrap(), id);
    assert_eq!(EntityRef::from(&id).resolve().unwrap(), id);

    let projection = Value::map([(ID_FIELD, "e1"), ("name", "x")]);
    assert_eq!(EntityRef::from(projection).resolve().unwrap(), id);
}

#[test]
fn entity_ref_rejects_other_shapes() {
    for bad in [
        Value::Int(1),
        Value::map([("name", "x")]),
        Value::map([(ID_FIELD, 5)]),
    ] {
        let err = EntityRef::from(bad).resolve().unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidArgument(_)));
    }
}
