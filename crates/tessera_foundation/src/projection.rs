//! Materialized entity projections.
//!
//! An [`Entity`] is what callers see of a stored entity: its component
//! fields plus its id. [`EntityRef`] is the "id or projection" argument
//! accepted wherever an operation needs to name an entity.

use std::sync::Arc;

use crate::collections::LtMap;
use crate::entity::EntityId;
use crate::error::{Error, Result};
use crate::types::Type;
use crate::value::Value;

/// Name of the projection field carrying the entity id.
///
/// Reserved: it is never stored as a component.
pub const ID_FIELD: &str = "id";

/// Materialized projection of an entity: `{..fields, id}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    id: EntityId,
    fields: LtMap<Arc<str>, Value>,
}

impl Entity {
    /// Creates a projection with no fields.
    #[must_use]
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            fields: LtMap::new(),
        }
    }

    /// Creates a projection with the given fields.
    #[must_use]
    pub fn with_fields(id: EntityId, fields: LtMap<Arc<str>, Value>) -> Self {
        Self { id, fields }
    }

    /// Returns the entity id.
    #[must_use]
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// Returns the component fields (without `id`).
    #[must_use]
    pub fn fields(&self) -> &LtMap<Arc<str>, Value> {
        &self.fields
    }

    /// Gets a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Sets a field on this projection (not on the stored entity).
    pub fn set(&mut self, name: impl Into<Arc<str>>, value: impl Into<Value>) {
        self.fields = self.fields.insert(name.into(), value.into());
    }

    /// Returns the map-shaped projection value, with `id` attached.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Map(
            self.fields
                .insert(ID_FIELD.into(), Value::String(self.id.as_str().into())),
        )
    }

    /// Rebuilds a projection from a map value carrying a string `id`.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch if `value` is not a map, or an invalid
    /// argument error if it has no usable `id`.
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Map(map) = value else {
            return Err(Error::type_mismatch(Type::Map, value.value_type()));
        };
        let id = EntityRef::Value(value.clone()).resolve()?;
        Ok(Self {
            id,
            fields: map.remove(ID_FIELD),
        })
    }
}

/// Argument naming an entity: a raw id or a previously materialized projection.
#[derive(Clone, Debug)]
pub enum EntityRef {
    /// An already parsed id.
    Id(EntityId),
    /// A string id or a projection map, as handed over by a caller.
    Value(Value),
}

impl EntityRef {
    /// Extracts the entity id.
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error when the value is neither a valid id
    /// string nor a map with a valid string `id` field.
    pub fn resolve(&self) -> Result<EntityId> {
        match self {
            Self::Id(id) => Ok(id.clone()),
            Self::Value(Value::String(raw)) => EntityId::parse(raw),
            Self::Value(Value::Map(map)) => match map.get(ID_FIELD) {
                Some(Value::String(raw)) => EntityId::parse(raw),
                Some(other) => Err(Error::invalid_argument(format!(
                    "projection id must be a string, got {}",
                    other.value_type()
                ))),
                None => Err(Error::invalid_argument("projection has no id field")),
            },
            Self::Value(other) => Err(Error::invalid_argument(format!(
                "expected an entity id or projection, got {}",
                other.value_type()
            ))),
        }
    }
}

impl From<EntityId> for EntityRef {
    fn from(id: EntityId) -> Self {
        Self::Id(id)
    }
}

impl From<&EntityId> for EntityRef {
    fn from(id: &EntityId) -> Self {
        Self::Id(id.clone())
    }
}

impl From<&Entity> for EntityRef {
    fn from(entity: &Entity) -> Self {
        Self::Id(entity.id.clone())
    }
}

impl From<Value> for EntityRef {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&Value> for EntityRef {
    fn from(value: &Value) -> Self {
        Self::Value(value.clone())
    }
}

impl From<&str> for EntityRef {
    fn from(raw: &str) -> Self {
        Self::Value(Value::from(raw))
    }
}
