//! Opaque entity identifiers.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Error, Result};

/// Globally unique, opaque entity identifier.
///
/// Freshly generated ids are random (v4) UUID strings, but any non-empty
/// string without NUL bytes is accepted when parsing, since ids arrive from
/// callers as plain strings. NUL is reserved as the key segment separator.
///
/// Cloning is O(1).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(Arc<str>);

impl EntityId {
    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string().into())
    }

    /// Parses an identifier supplied by a caller.
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error if `raw` is empty or contains a NUL byte.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::invalid_argument("entity id must not be empty"));
        }
        if raw.contains('\0') {
            return Err(Error::invalid_argument(format!(
                "entity id must not contain NUL: {raw:?}"
            )));
        }
        Ok(Self(raw.into()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the identifier as key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
