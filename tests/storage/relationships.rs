//! Integration tests for the relationship graph

use tessera_foundation::{EntityId, ErrorCategory, ErrorKind, Value};
use tessera_storage::{Related, RelationKind};

use crate::{all_keys, engine};

#[test]
fn links_are_visible_from_both_sides() {
    let engine = engine();
    let team = engine.insert("team", [("name", "Core")]).unwrap();
    let ana = engine.insert("user", [("name", "Ana")]).unwrap();
    let meta = Value::map([("role", "lead")]);

    engine
        .link(&ana, &team, "belongs", "members", Some(meta.clone()))
        .unwrap();

    assert_eq!(
        engine.related(&ana, "belongs", "members").unwrap(),
        vec![Related { id: team.id().clone(), metadata: meta.clone() }]
    );
    assert_eq!(
        engine.related(&team, "has", "members").unwrap(),
        vec![Related { id: ana.id().clone(), metadata: meta.clone() }]
    );
    assert!(engine.related(&ana, "has", "members").unwrap().is_empty());
    assert!(engine.related(&team, "belongs", "members").unwrap().is_empty());
}

#[test]
fn symmetric_links() {
    let engine = engine();
    let a = engine.insert("user", [("name", "A")]).unwrap();
    let b = engine.insert("user", [("name", "B")]).unwrap();
    engine.link(&a, &b, "are", "friends", None).unwrap();

    assert_eq!(engine.relationships_of(&a, "are", "friends").unwrap(), vec![Value::Nil]);
    assert_eq!(engine.relationships_of(&b, "are", "friends").unwrap(), vec![Value::Nil]);
}

#[test]
fn relinking_overwrites() {
    let engine = engine();
    let a = engine.insert("user", [("name", "A")]).unwrap();
    let b = engine.insert("user", [("name", "B")]).unwrap();
    engine.link(&a, &b, "belongs", "r", Some(Value::Int(1))).unwrap();
    engine.link(&a, &b, "has", "r", Some(Value::Int(2))).unwrap();

    assert!(engine.relationships_of(&a, "belongs", "r").unwrap().is_empty());
    assert_eq!(engine.relationships_of(&a, "has", "r").unwrap(), vec![Value::Int(2)]);
    assert_eq!(engine.relationships_of(&b, "belongs", "r").unwrap(), vec![Value::Int(2)]);
}

#[test]
fn relations_between_spans_names() {
    let engine = engine();
    let a = engine.insert("user", [("name", "A")]).unwrap();
    let b = engine.insert("user", [("name", "B")]).unwrap();
    engine.link(&a, &b, "are", "friends", None).unwrap();
    engine.link(&a, &b, "belongs", "reports", Some(Value::from("since 2020"))).unwrap();

    let between = engine.relations_between(&a, &b).unwrap();
    let summary: Vec<(&str, RelationKind)> =
        between.iter().map(|r| (r.name.as_str(), r.kind)).collect();
    assert_eq!(
        summary,
        vec![("friends", RelationKind::Are), ("reports", RelationKind::Belongs)]
    );
    assert_eq!(engine.relations_between(&b, &a).unwrap()[1].kind, RelationKind::Has);
}

#[test]
fn unknown_kind_is_rejected_before_any_write() {
    let engine = engine();
    let a = engine.insert("user", [("name", "A")]).unwrap();
    let b = engine.insert("user", [("name", "B")]).unwrap();
    let before = all_keys(&engine);

    let err = engine.link(&a, &b, "likes", "friends", None).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UndefinedRelationshipKind(ref k) if k == "likes"));
    let err = engine.relationships_of(&a, "likes", "friends").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Argument);
    assert_eq!(all_keys(&engine), before);
}

#[test]
fn link_requires_both_endpoints() {
    let engine = engine();
    let a = engine.insert("user", [("name", "A")]).unwrap();
    let err = engine
        .link(&a, EntityId::generate(), "are", "friends", None)
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::EntityNotFound(_)));
}

#[test]
fn self_link_is_rejected() {
    let engine = engine();
    let a = engine.insert("user", [("name", "A")]).unwrap();
    let err = engine.link(&a, &a, "are", "self", None).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidArgument(_)));
}

#[test]
fn deleting_a_partner_clears_relationships() {
    let engine = engine();
    let hub = engine.insert("hub", [("name", "hub")]).unwrap();
    let leaves: Vec<_> = (0..3)
        .map(|i| engine.insert("leaf", [("n", i)]).unwrap())
        .collect();
    for leaf in &leaves {
        engine.link(leaf, &hub, "belongs", "members", None).unwrap();
    }

    engine.delete(&leaves[0]).unwrap();
    assert_eq!(engine.related(&hub, "has", "members").unwrap().len(), 2);
    assert!(engine.relationships_of(&leaves[0], "belongs", "members").unwrap().is_empty());

    engine.delete(&hub).unwrap();
    for leaf in &leaves[1..] {
        assert!(engine.relationships_of(leaf, "belongs", "members").unwrap().is_empty());
        assert!(engine.relations_between(leaf, &hub).unwrap().is_empty());
    }
    assert!(!all_keys(&engine).iter().any(|k| k.starts_with("relationships.")));
}

#[test]
fn deleted_owner_disappears_from_partner() {
    let engine = engine();
    let e1 = engine.insert("user", [("name", "e1")]).unwrap();
    let e2 = engine.insert("user", [("name", "e2")]).unwrap();
    engine
        .link(&e1, &e2, "belongs", "friends", Some(Value::map([("years", 10)])))
        .unwrap();

    engine.delete(&e1).unwrap();
    assert!(engine.relationships_of(&e2, "has", "friends").unwrap().is_empty());
}
