//! Tag index.
//!
//! Each membership is stored twice, forward `(tag, entity)` for "who has
//! this tag" scans and reverse `(entity, tag)` for "which tags does this
//! entity have". The two entries are always written and removed together.

use std::fmt;

use tessera_foundation::{EntityId, Error, Result, Type, Value};
use tracing::debug;

use crate::entity;
use crate::keys;
use crate::kv::{KvRead, PrefixScan, WriteTxn};

/// One tag name or an ordered list of tag names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagSpec(Vec<String>);

impl TagSpec {
    /// Creates a spec from tag names.
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tags.into_iter().map(Into::into).collect())
    }

    /// Checks that the spec names at least one valid tag.
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error for an empty list or a bad name.
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(Error::invalid_argument("tag list must not be empty"));
        }
        for tag in &self.0 {
            keys::validate_name("tag", tag)?;
        }
        Ok(())
    }

    /// Iterates over the tag names in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of tag names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the spec names no tag.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TagSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

impl From<&str> for TagSpec {
    fn from(tag: &str) -> Self {
        Self(vec![tag.to_owned()])
    }
}

impl From<String> for TagSpec {
    fn from(tag: String) -> Self {
        Self(vec![tag])
    }
}

impl From<&[&str]> for TagSpec {
    fn from(tags: &[&str]) -> Self {
        Self::new(tags.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for TagSpec {
    fn from(tags: [&str; N]) -> Self {
        Self::new(tags)
    }
}

impl From<Vec<&str>> for TagSpec {
    fn from(tags: Vec<&str>) -> Self {
        Self::new(tags)
    }
}

impl From<Vec<String>> for TagSpec {
    fn from(tags: Vec<String>) -> Self {
        Self(tags)
    }
}

impl TryFrom<&Value> for TagSpec {
    type Error = Error;

    /// Accepts a string or a list of strings.
    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::String(tag) => Ok(Self::from(tag.to_string())),
            Value::List(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_owned)
                        .ok_or_else(|| Error::type_mismatch(Type::String, item.value_type()))
                })
                .collect::<Result<Vec<_>>>()
                .map(Self),
            other => Err(Error::type_mismatch(Type::String, other.value_type())),
        }
    }
}

/// Tags `id` with every tag in `tags`. Re-adding a tag is idempotent.
///
/// # Errors
///
/// Returns an argument error for an invalid spec and `EntityNotFound` if
/// `id` does not exist; nothing is written in either case.
pub fn add_tags(txn: &mut WriteTxn, tags: &TagSpec, id: &EntityId) -> Result<()> {
    tags.validate()?;
    entity::require(&*txn, id)?;
    for tag in tags.iter() {
        txn.set(keys::tag_forward(tag, id), keys::MARKER)?;
        txn.set(keys::tag_reverse(id, tag), keys::MARKER)?;
    }
    debug!(entity = %id, tags = %tags, "tagged entity");
    Ok(())
}

/// Removes both entries of one membership.
pub(crate) fn remove_tag(txn: &mut WriteTxn, tag: &str, id: &EntityId) -> Result<()> {
    txn.delete(&keys::tag_forward(tag, id))?;
    txn.delete(&keys::tag_reverse(id, tag))
}

/// Lazy scan over the trailing segment of every key under a prefix.
pub struct SegmentScan<'a> {
    inner: PrefixScan<'a>,
    prefix: Vec<u8>,
}

impl<'a> SegmentScan<'a> {
    fn new<R: KvRead + ?Sized>(txn: &'a R, prefix: Vec<u8>) -> Self {
        Self {
            inner: txn.scan_prefix(&prefix),
            prefix,
        }
    }
}

impl Iterator for SegmentScan<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.inner.next()?;
        Some(entry.and_then(|(key, _)| {
            keys::segment_after(&self.prefix, &key).map(str::to_owned)
        }))
    }
}

/// Lazy scan over the ids carrying a tag, in key order.
pub struct TagScan<'a>(SegmentScan<'a>);

impl Iterator for TagScan<'_> {
    type Item = Result<EntityId>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0
            .next()
            .map(|segment| segment.and_then(|s| EntityId::parse(&s)))
    }
}

/// Scans the entities carrying `tag`.
///
/// # Errors
///
/// Returns an invalid argument error for a bad tag name.
pub fn scan_by_tag<'a, R: KvRead + ?Sized>(txn: &'a R, tag: &str) -> Result<TagScan<'a>> {
    keys::validate_name("tag", tag)?;
    Ok(TagScan(SegmentScan::new(txn, keys::tag_prefix(tag))))
}

/// Scans the tag names carried by `id`.
pub fn reverse_scan<'a, R: KvRead + ?Sized>(txn: &'a R, id: &EntityId) -> SegmentScan<'a> {
    SegmentScan::new(txn, keys::tag_reverse_prefix(id))
}

/// Collects the tags of `id`, in name order.
///
/// # Errors
///
/// Returns a serialization error if a stored key is malformed, or an I/O
/// error if the store cannot be read.
pub fn tags_of<R: KvRead + ?Sized>(txn: &R, id: &EntityId) -> Result<Vec<String>> {
    reverse_scan(txn, id).collect()
}
