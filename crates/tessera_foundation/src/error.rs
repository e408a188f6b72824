//! Error types for Tessera.
//!
//! Uses `thiserror` for ergonomic error definition. Every [`ErrorKind`]
//! belongs to exactly one [`ErrorCategory`], which is what outer layers
//! (HTTP, sockets, tasks) use to decide how to report a failure.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::entity::EntityId;
use crate::types::Type;

/// Result type used throughout Tessera.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Tessera operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error, keeping any context already attached.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        if self.context.is_none() {
            self.context = Some(context);
        }
        self
    }

    /// Returns the failure class of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Creates an arity mismatch error.
    #[must_use]
    pub fn arity_mismatch(expected: impl Into<String>, actual: usize) -> Self {
        Self::new(ErrorKind::ArityMismatch {
            expected: expected.into(),
            actual,
        })
    }

    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument(message.into()))
    }

    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: Type, actual: Type) -> Self {
        Self::new(ErrorKind::TypeMismatch { expected, actual })
    }

    /// Creates an entity not found error.
    #[must_use]
    pub fn entity_not_found(id: EntityId) -> Self {
        Self::new(ErrorKind::EntityNotFound(id))
    }

    /// Creates a callback error, for use by predicate and mapper implementations.
    #[must_use]
    pub fn callback(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Callback(message.into()))
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(message: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Serialization(message.to_string()))
    }

    /// Creates an I/O error describing what was being attempted.
    #[must_use]
    pub fn io(action: impl fmt::Display, err: &std::io::Error) -> Self {
        Self::new(ErrorKind::Io(format!("{action}: {err}")))
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Wrong number of arguments.
    #[error("arity mismatch: expected {expected}, got {actual}")]
    ArityMismatch {
        /// Description of expected arity.
        expected: String,
        /// Actual number of arguments.
        actual: usize,
    },

    /// An argument was malformed (empty name, reserved field, bad id...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A value had the wrong type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The expected type.
        expected: Type,
        /// The actual type encountered.
        actual: Type,
    },

    /// Relationship kind is not one of `belongs`, `has`, `are`.
    #[error("undefined relationship type: {0}")]
    UndefinedRelationshipKind(String),

    /// Entity does not exist.
    #[error("entity does not exist: {0}")]
    EntityNotFound(EntityId),

    /// Another transaction committed a write this transaction depended on.
    #[error("transaction conflict, please retry")]
    TransactionConflict,

    /// Transaction write set exceeded the configured limit.
    #[error("transaction too large: more than {limit} pending writes")]
    TransactionTooLarge {
        /// The configured limit.
        limit: usize,
    },

    /// A single value exceeded the configured size limit.
    #[error("value too large: {size} bytes (limit {limit})")]
    ValueTooLarge {
        /// Encoded size of the value.
        size: usize,
        /// The configured limit.
        limit: usize,
    },

    /// The store has been closed.
    #[error("store is closed")]
    StoreClosed,

    /// A scan ran past its deadline.
    #[error("scan deadline of {0:?} exceeded")]
    Timeout(Duration),

    /// A predicate or mapper callback failed.
    #[error("callback failed: {0}")]
    Callback(String),

    /// Encoding or decoding a stored value failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Database or filesystem error in the storage backend.
    #[error("io error: {0}")]
    Io(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ErrorKind {
    /// Returns the failure class of this kind.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::ArityMismatch { .. }
            | Self::InvalidArgument(_)
            | Self::TypeMismatch { .. }
            | Self::UndefinedRelationshipKind(_) => ErrorCategory::Argument,
            Self::EntityNotFound(_) => ErrorCategory::Precondition,
            Self::Callback(_) => ErrorCategory::Callback,
            Self::TransactionConflict
            | Self::TransactionTooLarge { .. }
            | Self::ValueTooLarge { .. }
            | Self::StoreClosed
            | Self::Timeout(_)
            | Self::Serialization(_)
            | Self::Io(_)
            | Self::Internal(_) => ErrorCategory::Store,
        }
    }
}

/// Failure classes.
///
/// Argument and precondition errors are raised before the store is
/// written. Store errors abort the whole operation and roll its
/// transaction back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Wrong arity or type of an argument.
    Argument,
    /// Operation on an entity that does not exist.
    Precondition,
    /// Transaction conflict, size limit, I/O or encoding failure.
    Store,
    /// A callback reported a failure.
    Callback,
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Engine operation that failed (e.g. `insert`).
    pub operation: Option<&'static str>,
    /// Entity the operation was acting on.
    pub entity: Option<EntityId>,
}

impl ErrorContext {
    /// Creates a context naming an operation.
    #[must_use]
    pub fn operation(operation: &'static str) -> Self {
        Self {
            operation: Some(operation),
            entity: None,
        }
    }

    /// Sets the entity.
    #[must_use]
    pub fn with_entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(operation) = self.operation {
            write!(f, "in {operation}")?;
        }
        if let Some(entity) = &self.entity {
            write!(f, " (entity {entity})")?;
        }
        Ok(())
    }
}
