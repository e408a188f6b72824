//! The engine facade: the operations exposed to request handlers.
//!
//! Reads run in a snapshot, writes in one read-write transaction each.
//! Arguments are checked before a transaction is opened, so argument errors
//! never touch the store.

use std::sync::Arc;
use std::time::Duration;

use tessera_foundation::{Entity, EntityId, EntityRef, Error, ErrorContext, Result, Type, Value};

use crate::entity;
use crate::keys;
use crate::kv::Store;
use crate::query::{self, Callable, Deadline};
use crate::relationship::{self, Related, Relation, RelationKind};
use crate::tag::{self, TagSpec};

/// Options for [`Engine`].
#[derive(Clone, Debug, Default)]
pub struct EngineOptions {
    /// Upper bound on the duration of one select, delete-all or update-all
    /// call, checked after every callback.
    pub scan_deadline: Option<Duration>,
}

impl EngineOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the scan deadline.
    #[must_use]
    pub fn with_scan_deadline(mut self, deadline: Duration) -> Self {
        self.scan_deadline = Some(deadline);
        self
    }
}

/// Entity, tag and relationship operations over a shared [`Store`].
///
/// Cloning is O(1); clones share the store.
#[derive(Clone, Debug)]
pub struct Engine {
    store: Store,
    options: EngineOptions,
}

fn in_op<T>(operation: &'static str, result: Result<T>) -> Result<T> {
    result.map_err(|e| e.with_context(ErrorContext::operation(operation)))
}

fn on_entity<T>(operation: &'static str, id: &EntityId, result: Result<T>) -> Result<T> {
    result.map_err(|e| {
        e.with_context(ErrorContext::operation(operation).with_entity(id.clone()))
    })
}

impl Engine {
    /// Creates an engine with default options.
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self::with_options(store, EngineOptions::default())
    }

    /// Creates an engine with the given options.
    #[must_use]
    pub fn with_options(store: Store, options: EngineOptions) -> Self {
        Self { store, options }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The engine options.
    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Creates an entity tagged with `tags` and holding `fields`.
    ///
    /// # Errors
    ///
    /// Returns an argument error for no fields, a reserved or malformed field
    /// name, or a bad tag spec; a store error if the commit fails.
    pub fn insert<I, K, V>(&self, tags: impl Into<TagSpec>, fields: I) -> Result<Entity>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Arc<str>>,
        V: Into<Value>,
    {
        let tags = tags.into();
        in_op(
            "insert",
            tags.validate()
                .and_then(|()| entity::collect_fields(fields))
                .and_then(|fields| self.store.update(|txn| entity::insert(txn, &tags, fields))),
        )
    }

    /// Creates an entity from alternating name/value arguments.
    ///
    /// # Errors
    ///
    /// Returns `ArityMismatch` for an odd count or fewer than two arguments,
    /// `TypeMismatch` for a non-string name, or any [`Engine::insert`] error.
    pub fn insert_args(&self, tags: impl Into<TagSpec>, args: &[Value]) -> Result<Entity> {
        if args.len() < 2 || args.len() % 2 != 0 {
            return in_op(
                "insert",
                Err(Error::arity_mismatch(
                    "an even number of field arguments, at least 2",
                    args.len(),
                )),
            );
        }
        let pairs = args
            .chunks_exact(2)
            .map(|pair| match &pair[0] {
                Value::String(name) => Ok((name.clone(), pair[1].clone())),
                other => Err(Error::type_mismatch(Type::String, other.value_type())),
            })
            .collect::<Result<Vec<_>>>();
        match pairs {
            Ok(pairs) => self.insert(tags, pairs),
            Err(e) => in_op("insert", Err(e)),
        }
    }

    /// Fetches an entity. `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an argument error if `entity` does not name an id, or a store
    /// error.
    pub fn get(&self, entity: impl Into<EntityRef>) -> Result<Option<Entity>> {
        let id = in_op("get", entity.into().resolve())?;
        on_entity("get", &id, self.store.view(|txn| entity::load(txn, &id)))
    }

    /// Entities tagged `tag` for which `predicate` returns `true`.
    ///
    /// Predicate failures and non-boolean results are logged and count as
    /// no match.
    ///
    /// # Errors
    ///
    /// Returns an argument error for a bad tag, `Timeout` when the scan
    /// deadline passes, or a store error.
    pub fn select(&self, tag: &str, mut predicate: impl Callable) -> Result<Vec<Entity>> {
        let deadline = self.deadline();
        in_op(
            "select",
            self.store
                .view(|txn| query::select(txn, tag, &mut predicate, &deadline)),
        )
    }

    /// Deletes an entity with its components, tags and relationships.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if it does not exist, or a store error. No
    /// partial deletion is ever committed.
    pub fn delete(&self, entity: impl Into<EntityRef>) -> Result<()> {
        let id = in_op("delete", entity.into().resolve())?;
        on_entity("delete", &id, self.store.update(|txn| entity::delete(txn, &id)))
    }

    /// Tags an existing entity.
    ///
    /// # Errors
    ///
    /// Returns an argument error for a bad spec, `EntityNotFound`, or a store
    /// error. No tag is written on error.
    pub fn add_tag(&self, tags: impl Into<TagSpec>, entity: impl Into<EntityRef>) -> Result<()> {
        let tags = tags.into();
        let id = in_op("add_tag", tags.validate().and_then(|()| entity.into().resolve()))?;
        on_entity(
            "add_tag",
            &id,
            self.store.update(|txn| tag::add_tags(txn, &tags, &id)),
        )
    }

    /// Tags carried by an entity, in name order. Empty for unknown entities.
    ///
    /// # Errors
    ///
    /// Returns an argument error if `entity` does not name an id, or a store
    /// error.
    pub fn tags_of(&self, entity: impl Into<EntityRef>) -> Result<Vec<String>> {
        let id = in_op("tags_of", entity.into().resolve())?;
        on_entity("tags_of", &id, self.store.view(|txn| tag::tags_of(txn, &id)))
    }

    /// Relates `from` to `to` with `kind` under `name`; `to` sees the mirror
    /// kind. Metadata defaults to nil and is stored on both edges.
    ///
    /// # Errors
    ///
    /// Returns `UndefinedRelationshipKind` for an unknown kind, an argument
    /// error for a bad name or a self-link, `EntityNotFound` if either
    /// endpoint is missing, or a store error.
    pub fn link(
        &self,
        from: impl Into<EntityRef>,
        to: impl Into<EntityRef>,
        kind: &str,
        name: &str,
        metadata: Option<Value>,
    ) -> Result<()> {
        let (from, to, kind) =
            in_op("link", Self::link_args(from.into(), to.into(), kind, name))?;
        let metadata = metadata.unwrap_or(Value::Nil);
        on_entity(
            "link",
            &from,
            self.store
                .update(|txn| relationship::link(txn, &from, &to, kind, name, &metadata)),
        )
    }

    fn link_args(
        from: EntityRef,
        to: EntityRef,
        kind: &str,
        name: &str,
    ) -> Result<(EntityId, EntityId, RelationKind)> {
        let (from, kind) = Self::edge_args(from, kind, name)?;
        Ok((from, to.resolve()?, kind))
    }

    /// Metadata of every edge from `entity` under `name` whose kind is `kind`.
    ///
    /// Unknown entities and unknown names yield an empty list.
    ///
    /// # Errors
    ///
    /// Returns `UndefinedRelationshipKind`, an argument error, or a store
    /// error.
    pub fn relationships_of(
        &self,
        entity: impl Into<EntityRef>,
        kind: &str,
        name: &str,
    ) -> Result<Vec<Value>> {
        let (id, kind) =
            in_op("relationships_of", Self::edge_args(entity.into(), kind, name))?;
        on_entity(
            "relationships_of",
            &id,
            self.store
                .view(|txn| relationship::relationships_of(txn, &id, kind, name)),
        )
    }

    /// Like [`Engine::relationships_of`], also returning each partner id.
    ///
    /// # Errors
    ///
    /// See [`Engine::relationships_of`].
    pub fn related(
        &self,
        entity: impl Into<EntityRef>,
        kind: &str,
        name: &str,
    ) -> Result<Vec<Related>> {
        let (id, kind) = in_op("related", Self::edge_args(entity.into(), kind, name))?;
        on_entity(
            "related",
            &id,
            self.store
                .view(|txn| relationship::related(txn, &id, kind, name)),
        )
    }

    fn edge_args(entity: EntityRef, kind: &str, name: &str) -> Result<(EntityId, RelationKind)> {
        let kind: RelationKind = kind.parse()?;
        keys::validate_name("relation name", name)?;
        Ok((entity.resolve()?, kind))
    }

    /// Every relationship from `from` to `to`, across relation names.
    ///
    /// # Errors
    ///
    /// Returns an argument error if either argument does not name an id, or
    /// a store error.
    pub fn relations_between(
        &self,
        from: impl Into<EntityRef>,
        to: impl Into<EntityRef>,
    ) -> Result<Vec<Relation>> {
        let from = in_op("relations_between", from.into().resolve())?;
        let to = in_op("relations_between", to.into().resolve())?;
        on_entity(
            "relations_between",
            &from,
            self.store
                .view(|txn| relationship::relations_between(txn, &from, &to)),
        )
    }

    /// Deletes every entity tagged `tag` that satisfies `predicate`, in one
    /// transaction. Returns how many were deleted.
    ///
    /// # Errors
    ///
    /// As [`Engine::select`]; on error nothing is deleted.
    pub fn delete_all(&self, tag: &str, mut predicate: impl Callable) -> Result<usize> {
        let deadline = self.deadline();
        in_op(
            "delete_all",
            self.store
                .update(|txn| query::delete_all(txn, tag, &mut predicate, &deadline)),
        )
    }

    /// Writes the fields returned by `mapper` onto every entity tagged `tag`
    /// that satisfies `predicate`, in one transaction. Returns how many
    /// matched.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the mapper returns a non-map, the mapper's
    /// own error, or any [`Engine::select`] error; on error nothing is
    /// written.
    pub fn update_all(
        &self,
        tag: &str,
        mut mapper: impl Callable,
        mut predicate: impl Callable,
    ) -> Result<usize> {
        let deadline = self.deadline();
        in_op(
            "update_all",
            self.store.update(|txn| {
                query::update_all(txn, tag, &mut mapper, &mut predicate, &deadline)
            }),
        )
    }

    fn deadline(&self) -> Deadline {
        Deadline::start(self.options.scan_deadline)
    }
}
