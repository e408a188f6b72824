//! Entity lifecycle: insert, existence, materialization and cascading delete.
//!
//! Every function runs inside a caller-supplied transaction; the caller owns
//! commit and rollback.

use std::sync::Arc;

use tessera_foundation::{Entity, EntityId, Error, ID_FIELD, LtMap, Result, Value};
use tracing::debug;

use crate::envelope;
use crate::keys;
use crate::kv::{KvRead, WriteTxn};
use crate::relationship;
use crate::tag::{self, TagSpec};

/// Returns true if the existence marker of `id` is present.
///
/// # Errors
///
/// Returns an I/O error if the store cannot be read.
pub fn exists<R: KvRead + ?Sized>(txn: &R, id: &EntityId) -> Result<bool> {
    txn.contains(&keys::entity(id))
}

/// Fails unless `id` exists.
///
/// # Errors
///
/// Returns `EntityNotFound` if the existence marker is absent.
pub fn require<R: KvRead + ?Sized>(txn: &R, id: &EntityId) -> Result<()> {
    if exists(txn, id)? {
        Ok(())
    } else {
        Err(Error::entity_not_found(id.clone()))
    }
}

/// Materializes `id` from its component entries.
///
/// Returns `None` when the entity does not exist. An existing entity with no
/// fields yields an empty projection.
///
/// # Errors
///
/// Returns a serialization error if a stored component cannot be decoded.
pub fn load<R: KvRead + ?Sized>(txn: &R, id: &EntityId) -> Result<Option<Entity>> {
    if !exists(txn, id)? {
        return Ok(None);
    }
    let prefix = keys::component_prefix(id);
    let mut fields = LtMap::new();
    for entry in txn.scan_prefix(&prefix) {
        let (key, bytes) = entry?;
        let name = keys::segment_after(&prefix, &key)?;
        fields = fields.insert(Arc::from(name), envelope::decode(&bytes)?);
    }
    Ok(Some(Entity::with_fields(id.clone(), fields)))
}

/// Checks insert fields and collects them into a map; later names win.
///
/// # Errors
///
/// Returns an arity error when no field is given and an invalid argument
/// error for empty, NUL-bearing or reserved names.
pub fn collect_fields<I, K, V>(fields: I) -> Result<LtMap<Arc<str>, Value>>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<Arc<str>>,
    V: Into<Value>,
{
    let mut map = LtMap::new();
    for (name, value) in fields {
        let name: Arc<str> = name.into();
        keys::validate_name("field name", &name)?;
        if &*name == ID_FIELD {
            return Err(Error::invalid_argument(format!(
                "field name `{ID_FIELD}` is reserved"
            )));
        }
        map = map.insert(name, value.into());
    }
    if map.is_empty() {
        return Err(Error::arity_mismatch("at least one field", 0));
    }
    Ok(map)
}

/// Creates a new entity with a fresh id, its tags and its fields.
///
/// # Errors
///
/// Returns an argument error for an invalid tag spec, or a store error if
/// any write fails. Nothing is written for argument errors.
pub fn insert(
    txn: &mut WriteTxn,
    tags: &TagSpec,
    fields: LtMap<Arc<str>, Value>,
) -> Result<Entity> {
    tags.validate()?;
    let id = EntityId::generate();
    txn.set(keys::entity(&id), keys::MARKER)?;
    tag::add_tags(txn, tags, &id)?;
    for (name, value) in fields.iter() {
        write_field(txn, &id, name, value)?;
    }
    debug!(entity = %id, tags = %tags, fields = fields.len(), "inserted entity");
    Ok(Entity::with_fields(id, fields))
}

/// Writes one component, overwriting any previous value.
///
/// # Errors
///
/// Returns a store error if the value cannot be encoded or written.
pub fn write_field(txn: &mut WriteTxn, id: &EntityId, name: &str, value: &Value) -> Result<()> {
    txn.set(keys::component(id, name), envelope::encode(value)?)
}

/// Deletes `id` with all of its components, tags and relationships.
///
/// # Errors
///
/// Returns `EntityNotFound` if the entity does not exist (nothing is
/// written), or a store error.
pub fn delete(txn: &mut WriteTxn, id: &EntityId) -> Result<()> {
    require(&*txn, id)?;

    let tags = tag::tags_of(&*txn, id)?;
    for name in &tags {
        tag::remove_tag(txn, name, id)?;
    }

    let partners = relationship::unlink_all(txn, id)?;

    let prefix = keys::component_prefix(id);
    let components = txn
        .scan_prefix(&prefix)
        .map(|entry| entry.map(|(key, _)| key))
        .collect::<Result<Vec<_>>>()?;
    for key in &components {
        txn.delete(key)?;
    }

    txn.delete(&keys::entity(id))?;
    debug!(
        entity = %id,
        tags = tags.len(),
        edges = partners,
        fields = components.len(),
        "deleted entity"
    );
    Ok(())
}
