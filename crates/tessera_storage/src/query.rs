//! Query/update executor.
//!
//! Every operation scans one tag, materializes each candidate and hands it
//! to caller-supplied callbacks. Write operations collect the candidate ids
//! before mutating, so their own writes never disturb the scan.

use std::time::{Duration, Instant};

use tessera_foundation::{Entity, EntityId, Error, ErrorKind, ID_FIELD, Result, Type, Value};
use tracing::{debug, warn};

use crate::entity;
use crate::keys;
use crate::kv::{KvRead, WriteTxn};
use crate::tag;

/// A callback invoked with a materialized entity.
///
/// Predicates return `Bool`; mappers return a map-shaped patch.
pub trait Callable {
    /// Invokes the callback.
    ///
    /// # Errors
    ///
    /// Implementations return an error when the callback itself fails.
    fn call(&mut self, entity: &Entity) -> Result<Value>;
}

impl<F> Callable for F
where
    F: FnMut(&Entity) -> Result<Value>,
{
    fn call(&mut self, entity: &Entity) -> Result<Value> {
        self(entity)
    }
}

/// Pins a closure to the [`Callable`] signature so its argument and
/// return types can be inferred.
pub fn callback<F>(f: F) -> F
where
    F: FnMut(&Entity) -> Result<Value>,
{
    f
}

/// A predicate matching every entity.
#[must_use]
pub fn always() -> impl Callable {
    callback(|_| Ok(Value::Bool(true)))
}

/// Wall-clock budget for one scan, checked after every callback.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    /// Starts the clock. `None` means unbounded.
    #[must_use]
    pub fn start(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    /// Fails once the budget is spent.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` when the elapsed time exceeds the limit.
    pub fn check(&self) -> Result<()> {
        match self.limit {
            Some(limit) if self.started.elapsed() > limit => {
                Err(Error::new(ErrorKind::Timeout(limit)))
            }
            _ => Ok(()),
        }
    }
}

/// Runs a predicate. Errors and non-boolean results count as no match.
fn is_match<P: Callable + ?Sized>(predicate: &mut P, entity: &Entity) -> bool {
    match predicate.call(entity) {
        Ok(Value::Bool(matched)) => matched,
        Ok(other) => {
            warn!(
                entity = %entity.id(),
                result = %other.value_type(),
                "predicate returned a non-boolean, treating as no match"
            );
            false
        }
        Err(err) => {
            warn!(entity = %entity.id(), error = %err, "predicate failed, treating as no match");
            false
        }
    }
}

fn candidates<R: KvRead + ?Sized>(txn: &R, tag: &str) -> Result<Vec<EntityId>> {
    tag::scan_by_tag(txn, tag)?.collect()
}

/// Entities tagged `tag` that satisfy `predicate`, in id order.
///
/// # Errors
///
/// Returns an argument error for a bad tag, `Timeout` if the deadline
/// passes, or a store error.
pub fn select<R, P>(
    txn: &R,
    tag: &str,
    predicate: &mut P,
    deadline: &Deadline,
) -> Result<Vec<Entity>>
where
    R: KvRead + ?Sized,
    P: Callable + ?Sized,
{
    let mut out = Vec::new();
    for id in tag::scan_by_tag(txn, tag)? {
        let Some(entity) = entity::load(txn, &id?)? else {
            continue;
        };
        let keep = is_match(predicate, &entity);
        deadline.check()?;
        if keep {
            out.push(entity);
        }
    }
    Ok(out)
}

/// Deletes every entity tagged `tag` that satisfies `predicate`.
///
/// Returns the number deleted.
///
/// # Errors
///
/// As [`select`]; any error aborts the whole transaction.
pub fn delete_all<P>(
    txn: &mut WriteTxn,
    tag: &str,
    predicate: &mut P,
    deadline: &Deadline,
) -> Result<usize>
where
    P: Callable + ?Sized,
{
    let mut deleted = 0;
    for id in candidates(&*txn, tag)? {
        let Some(entity) = entity::load(&*txn, &id)? else {
            continue;
        };
        let hit = is_match(predicate, &entity);
        deadline.check()?;
        if hit {
            entity::delete(txn, &id)?;
            deleted += 1;
        }
    }
    debug!(tag, deleted, "deleted matching entities");
    Ok(deleted)
}

/// Patches every entity tagged `tag` that satisfies `predicate` with the
/// fields returned by `mapper`. The `id` field of a patch is ignored.
///
/// Returns the number of entities that matched.
///
/// # Errors
///
/// Returns `TypeMismatch` if the mapper returns anything but a map,
/// `InvalidArgument` if a patch names an empty or NUL-bearing field, the
/// mapper's own error if it fails, or any error [`select`] can return.
pub fn update_all<M, P>(
    txn: &mut WriteTxn,
    tag: &str,
    mapper: &mut M,
    predicate: &mut P,
    deadline: &Deadline,
) -> Result<usize>
where
    M: Callable + ?Sized,
    P: Callable + ?Sized,
{
    let mut updated = 0;
    for id in candidates(&*txn, tag)? {
        let Some(entity) = entity::load(&*txn, &id)? else {
            continue;
        };
        let hit = is_match(predicate, &entity);
        deadline.check()?;
        if !hit {
            continue;
        }
        updated += 1;

        let patch = mapper.call(&entity)?;
        deadline.check()?;
        let Value::Map(fields) = patch else {
            return Err(Error::type_mismatch(Type::Map, patch.value_type()));
        };
        let writes: Vec<_> = fields
            .iter()
            .filter(|(name, _)| &***name != ID_FIELD)
            .collect();
        for (name, _) in &writes {
            keys::validate_name("field name", name)?;
        }
        for (name, value) in writes {
            entity::write_field(txn, &id, name, value)?;
        }
    }
    debug!(tag, updated, "updated matching entities");
    Ok(updated)
}
