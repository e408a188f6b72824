//! Integration tests for Error types
//!
//! Tests error construction, display, categories, and context.

use std::time::Duration;

use tessera_foundation::{EntityId, Error, ErrorCategory, ErrorContext, ErrorKind, Type};

// =============================================================================
// Error Construction
// =============================================================================

#[test]
fn error_type_mismatch() {
    let err = Error::type_mismatch(Type::Map, Type::String);
    assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));
    let msg = format!("{err}");
    assert!(msg.contains("map") && msg.contains("string"));
}

#[test]
fn error_entity_not_found() {
    let id = EntityId::parse("e42").unwrap();
    let err = Error::entity_not_found(id);
    assert!(matches!(err.kind, ErrorKind::EntityNotFound(_)));
    assert!(format!("{err}").contains("e42"));
}

#[test]
fn error_arity_mismatch() {
    let err = Error::arity_mismatch("an even number", 3);
    assert!(matches!(err.kind, ErrorKind::ArityMismatch { actual: 3, .. }));
    assert!(format!("{err}").contains("an even number"));
}

// =============================================================================
// Categories
// =============================================================================

#[test]
fn every_kind_has_one_category() {
    let cases = [
        (Error::invalid_argument("x"), ErrorCategory::Argument),
        (
            Error::new(ErrorKind::UndefinedRelationshipKind("likes".into())),
            ErrorCategory::Argument,
        ),
        (
            Error::entity_not_found(EntityId::generate()),
            ErrorCategory::Precondition,
        ),
        (Error::callback("boom"), ErrorCategory::Callback),
        (Error::new(ErrorKind::TransactionConflict), ErrorCategory::Store),
        (
            Error::new(ErrorKind::Timeout(Duration::from_secs(1))),
            ErrorCategory::Store,
        ),
        (Error::new(ErrorKind::StoreClosed), ErrorCategory::Store),
        (Error::serialization("bad bytes"), ErrorCategory::Store),
    ];
    for (err, category) in cases {
        assert_eq!(err.category(), category, "{err}");
    }
}

// =============================================================================
// Context
// =============================================================================

#[test]
fn context_names_operation_and_entity() {
    let id = EntityId::parse("e1").unwrap();
    let err = Error::entity_not_found(id.clone())
        .with_context(ErrorContext::operation("delete").with_entity(id.clone()));
    let ctx = err.context.unwrap();
    assert_eq!(ctx.operation, Some("delete"));
    assert_eq!(ctx.entity, Some(id));
}
