//! Relationship graph.
//!
//! A link between `a` and `b` under relation `rel` is stored as two
//! directional edges, `a -> b` carrying the requested kind and `b -> a`
//! carrying its mirror, each with its own copy of the metadata. Both
//! endpoints also record `rel` in their relation-name index, which is how a
//! cascading delete finds every edge touching an entity.

use std::fmt;
use std::str::FromStr;

use tessera_foundation::{EntityId, Error, ErrorKind, Result, Value};
use tracing::debug;

use crate::entity;
use crate::envelope;
use crate::keys;
use crate::kv::{KvRead, WriteTxn};

/// Directional semantics of an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// The source belongs to the target.
    Belongs,
    /// The source has the target.
    Has,
    /// Symmetric.
    Are,
}

impl RelationKind {
    /// Kind stored on the opposite edge.
    #[must_use]
    pub const fn mirror(self) -> Self {
        match self {
            Self::Belongs => Self::Has,
            Self::Has => Self::Belongs,
            Self::Are => Self::Are,
        }
    }

    /// Stored name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Belongs => "belongs",
            Self::Has => "has",
            Self::Are => "are",
        }
    }
}

impl FromStr for RelationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "belongs" => Ok(Self::Belongs),
            "has" => Ok(Self::Has),
            "are" => Ok(Self::Are),
            other => Err(Error::new(ErrorKind::UndefinedRelationshipKind(
                other.to_owned(),
            ))),
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A partner reached through an edge, with the edge's metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Related {
    /// Partner entity.
    pub id: EntityId,
    /// Metadata stored on the edge, `Nil` if none.
    pub metadata: Value,
}

/// One edge from a fixed source to a fixed target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relation {
    /// Relation name.
    pub name: String,
    /// Kind as seen from the source.
    pub kind: RelationKind,
    /// Metadata stored on the edge, `Nil` if none.
    pub metadata: Value,
}

/// Links `from` to `to` under `name`, overwriting any previous link between them.
///
/// # Errors
///
/// Returns an invalid argument error for a bad name or a self-link,
/// `EntityNotFound` if either endpoint is missing, or a store error.
pub fn link(
    txn: &mut WriteTxn,
    from: &EntityId,
    to: &EntityId,
    kind: RelationKind,
    name: &str,
    metadata: &Value,
) -> Result<()> {
    keys::validate_name("relation name", name)?;
    if from == to {
        return Err(Error::invalid_argument(format!(
            "cannot relate entity {from} to itself"
        )));
    }
    entity::require(&*txn, from)?;
    entity::require(&*txn, to)?;

    let meta = envelope::encode(metadata)?;
    txn.set(keys::edge(name, from, to), kind.as_str())?;
    txn.set(keys::edge(name, to, from), kind.mirror().as_str())?;
    txn.set(keys::edge_meta(name, from, to), meta.clone())?;
    txn.set(keys::edge_meta(name, to, from), meta)?;
    txn.set(keys::relation_name(from, name), keys::MARKER)?;
    txn.set(keys::relation_name(to, name), keys::MARKER)?;
    debug!(from = %from, to = %to, relation = name, kind = %kind, "linked entities");
    Ok(())
}

fn parse_kind(raw: &[u8]) -> Result<RelationKind> {
    std::str::from_utf8(raw)
        .map_err(Error::serialization)?
        .parse()
}

fn edge_metadata<R: KvRead + ?Sized>(
    txn: &R,
    name: &str,
    from: &EntityId,
    to: &EntityId,
) -> Result<Value> {
    txn.get(&keys::edge_meta(name, from, to))?
        .map_or(Ok(Value::Nil), |bytes| envelope::decode(&bytes))
}

/// Partners of `id` under `name` whose edge from `id` has `kind`, in id order.
///
/// # Errors
///
/// Returns an invalid argument error for a bad name, or a serialization
/// error for corrupt entries.
pub fn related<R: KvRead + ?Sized>(
    txn: &R,
    id: &EntityId,
    kind: RelationKind,
    name: &str,
) -> Result<Vec<Related>> {
    keys::validate_name("relation name", name)?;
    let prefix = keys::edge_prefix(name, id);
    let mut out = Vec::new();
    for entry in txn.scan_prefix(&prefix) {
        let (key, stored) = entry?;
        if parse_kind(&stored)? != kind {
            continue;
        }
        let partner = EntityId::parse(keys::segment_after(&prefix, &key)?)?;
        let metadata = edge_metadata(txn, name, id, &partner)?;
        out.push(Related {
            id: partner,
            metadata,
        });
    }
    Ok(out)
}

/// Metadata of every edge from `id` under `name` with the given kind.
///
/// An unknown entity yields an empty list.
///
/// # Errors
///
/// See [`related`].
pub fn relationships_of<R: KvRead + ?Sized>(
    txn: &R,
    id: &EntityId,
    kind: RelationKind,
    name: &str,
) -> Result<Vec<Value>> {
    Ok(related(txn, id, kind, name)?
        .into_iter()
        .map(|r| r.metadata)
        .collect())
}

/// Relation names that touch `id`, in name order.
///
/// # Errors
///
/// Returns a serialization error for corrupt entries.
pub fn relation_names<R: KvRead + ?Sized>(txn: &R, id: &EntityId) -> Result<Vec<String>> {
    let prefix = keys::relation_name_prefix(id);
    txn.scan_prefix(&prefix)
        .map(|entry| {
            let (key, _) = entry?;
            keys::segment_after(&prefix, &key).map(str::to_owned)
        })
        .collect()
}

/// Every edge from `from` to `to`, across all relation names.
///
/// # Errors
///
/// Returns a serialization error for corrupt entries.
pub fn relations_between<R: KvRead + ?Sized>(
    txn: &R,
    from: &EntityId,
    to: &EntityId,
) -> Result<Vec<Relation>> {
    let mut out = Vec::new();
    for name in relation_names(txn, from)? {
        let Some(stored) = txn.get(&keys::edge(&name, from, to))? else {
            continue;
        };
        let kind = parse_kind(&stored)?;
        let metadata = edge_metadata(txn, &name, from, to)?;
        out.push(Relation {
            name,
            kind,
            metadata,
        });
    }
    Ok(out)
}

/// Removes every edge touching `id`, on both sides, and its relation-name
/// index. A partner's index entry for a name is removed once the partner
/// has no edges left under it. Returns the number of links removed.
pub(crate) fn unlink_all(txn: &mut WriteTxn, id: &EntityId) -> Result<usize> {
    let mut removed = 0;
    for name in relation_names(&*txn, id)? {
        let prefix = keys::edge_prefix(&name, id);
        let partners = txn
            .scan_prefix(&prefix)
            .map(|entry| {
                let (key, _) = entry?;
                keys::segment_after(&prefix, &key).and_then(EntityId::parse)
            })
            .collect::<Result<Vec<_>>>()?;

        for partner in &partners {
            txn.delete(&keys::edge(&name, id, partner))?;
            txn.delete(&keys::edge(&name, partner, id))?;
            txn.delete(&keys::edge_meta(&name, id, partner))?;
            txn.delete(&keys::edge_meta(&name, partner, id))?;

            let orphaned = txn
                .scan_prefix(&keys::edge_prefix(&name, partner))
                .next()
                .transpose()?
                .is_none();
            if orphaned {
                txn.delete(&keys::relation_name(partner, &name))?;
            }
        }
        txn.delete(&keys::relation_name(id, &name))?;
        removed += partners.len();
    }
    Ok(removed)
}
