//! Key codec.
//!
//! Maps logical facts to keys in one ordered byte namespace. Every key
//! starts with one of four family prefixes, and every segment after the
//! prefix is terminated by [`SEP`], so a prefix scan over
//! `(family, a, b)` can never match `(family, a, bc)`.
//!
//! | Fact                 | Key                                          |
//! |----------------------|----------------------------------------------|
//! | existence marker     | `entities.` id                               |
//! | component            | `components.` id, name                       |
//! | tag, forward         | `tags.` `fwd`, tag, id                       |
//! | tag, reverse         | `tags.` `rev`, id, tag                       |
//! | edge                 | `relationships.` `edge`, rel, from, to       |
//! | edge metadata        | `relationships.` `meta`, rel, from, to       |
//! | relation-name index  | `relationships.` `name`, id, rel             |

use tessera_foundation::{EntityId, Error, Result};

/// Family of existence markers.
pub const ENTITIES: &[u8] = b"entities.";
/// Family of component values.
pub const COMPONENTS: &[u8] = b"components.";
/// Family of tag memberships, both directions.
pub const TAGS: &[u8] = b"tags.";
/// Family of relationship edges, their metadata and the relation-name index.
pub const RELATIONSHIPS: &[u8] = b"relationships.";

/// Every family, in no particular order.
pub const FAMILIES: [&[u8]; 4] = [ENTITIES, COMPONENTS, TAGS, RELATIONSHIPS];

/// Segment terminator.
pub const SEP: u8 = 0;

/// Value of keys whose presence is the whole fact.
pub const MARKER: &[u8] = b"1";

const TAG_FORWARD: &[u8] = b"fwd";
const TAG_REVERSE: &[u8] = b"rev";
const EDGE: &[u8] = b"edge";
const EDGE_META: &[u8] = b"meta";
const RELATION_NAME: &[u8] = b"name";

struct KeyBuf(Vec<u8>);

impl KeyBuf {
    fn family(family: &[u8]) -> Self {
        Self(family.to_vec())
    }

    fn segment(mut self, segment: impl AsRef<[u8]>) -> Self {
        self.0.extend_from_slice(segment.as_ref());
        self.0.push(SEP);
        self
    }

    fn finish(self) -> Vec<u8> {
        self.0
    }
}

/// Checks that a tag, component or relation name can be used as a key segment.
///
/// # Errors
///
/// Returns an invalid argument error for empty names and names containing NUL.
pub fn validate_name(what: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_argument(format!("{what} must not be empty")));
    }
    if name.contains('\0') {
        return Err(Error::invalid_argument(format!(
            "{what} must not contain NUL: {name:?}"
        )));
    }
    Ok(())
}

/// Existence marker of `id`.
#[must_use]
pub fn entity(id: &EntityId) -> Vec<u8> {
    KeyBuf::family(ENTITIES).segment(id.as_bytes()).finish()
}

/// Component `name` of `id`.
#[must_use]
pub fn component(id: &EntityId, name: &str) -> Vec<u8> {
    KeyBuf::family(COMPONENTS)
        .segment(id.as_bytes())
        .segment(name)
        .finish()
}

/// Prefix of every component of `id`.
#[must_use]
pub fn component_prefix(id: &EntityId) -> Vec<u8> {
    KeyBuf::family(COMPONENTS).segment(id.as_bytes()).finish()
}

/// Forward tag entry: `tag` holds `id`.
#[must_use]
pub fn tag_forward(tag: &str, id: &EntityId) -> Vec<u8> {
    KeyBuf::family(TAGS)
        .segment(TAG_FORWARD)
        .segment(tag)
        .segment(id.as_bytes())
        .finish()
}

/// Prefix of every entity carrying `tag`.
#[must_use]
pub fn tag_prefix(tag: &str) -> Vec<u8> {
    KeyBuf::family(TAGS)
        .segment(TAG_FORWARD)
        .segment(tag)
        .finish()
}

/// Reverse tag entry: `id` carries `tag`.
#[must_use]
pub fn tag_reverse(id: &EntityId, tag: &str) -> Vec<u8> {
    KeyBuf::family(TAGS)
        .segment(TAG_REVERSE)
        .segment(id.as_bytes())
        .segment(tag)
        .finish()
}

/// Prefix of every tag carried by `id`.
#[must_use]
pub fn tag_reverse_prefix(id: &EntityId) -> Vec<u8> {
    KeyBuf::family(TAGS)
        .segment(TAG_REVERSE)
        .segment(id.as_bytes())
        .finish()
}

/// Directional edge `from -> to` under relation `rel`. The value is the kind.
#[must_use]
pub fn edge(rel: &str, from: &EntityId, to: &EntityId) -> Vec<u8> {
    KeyBuf::family(RELATIONSHIPS)
        .segment(EDGE)
        .segment(rel)
        .segment(from.as_bytes())
        .segment(to.as_bytes())
        .finish()
}

/// Prefix of every edge leaving `from` under relation `rel`.
#[must_use]
pub fn edge_prefix(rel: &str, from: &EntityId) -> Vec<u8> {
    KeyBuf::family(RELATIONSHIPS)
        .segment(EDGE)
        .segment(rel)
        .segment(from.as_bytes())
        .finish()
}

/// Metadata of the directional edge `from -> to` under relation `rel`.
#[must_use]
pub fn edge_meta(rel: &str, from: &EntityId, to: &EntityId) -> Vec<u8> {
    KeyBuf::family(RELATIONSHIPS)
        .segment(EDGE_META)
        .segment(rel)
        .segment(from.as_bytes())
        .segment(to.as_bytes())
        .finish()
}

/// Relation-name index entry: `id` has edges under `rel`.
#[must_use]
pub fn relation_name(id: &EntityId, rel: &str) -> Vec<u8> {
    KeyBuf::family(RELATIONSHIPS)
        .segment(RELATION_NAME)
        .segment(id.as_bytes())
        .segment(rel)
        .finish()
}

/// Prefix of every relation name touching `id`.
#[must_use]
pub fn relation_name_prefix(id: &EntityId) -> Vec<u8> {
    KeyBuf::family(RELATIONSHIPS)
        .segment(RELATION_NAME)
        .segment(id.as_bytes())
        .finish()
}

/// Decodes the segment that immediately follows `prefix` in `key`.
///
/// # Errors
///
/// Returns a serialization error if `key` does not extend `prefix` with a
/// terminated UTF-8 segment.
pub fn segment_after<'k>(prefix: &[u8], key: &'k [u8]) -> Result<&'k str> {
    let malformed = || Error::serialization(format!("malformed key {}", display_key(key)));
    let rest = key.strip_prefix(prefix).ok_or_else(malformed)?;
    let end = rest.iter().position(|&b| b == SEP).ok_or_else(malformed)?;
    std::str::from_utf8(&rest[..end]).map_err(|_| malformed())
}

/// Renders a key for humans, showing separators as `/`.
#[must_use]
pub fn display_key(key: &[u8]) -> String {
    let trimmed = key.strip_suffix(&[SEP]).unwrap_or(key);
    String::from_utf8_lossy(trimmed).replace('\0', "/")
}
