//! Entity, tag and relationship storage for Tessera.
//!
//! This crate provides:
//! - [`kv`] - Ordered transactional key-value store on redb, with snapshots and optimistic conflict detection
//! - [`keys`] - Key codec partitioning the keyspace into entity, component, tag and relationship families
//! - [`entity`] - Entity lifecycle (insert, materialize, cascading delete)
//! - [`tag`] - Forward and reverse tag index
//! - [`relationship`] - Mirrored, typed relationship edges with metadata
//! - [`query`] - Predicate-driven select, delete-all and update-all
//! - [`Engine`] - The facade tying them together

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod engine;
pub mod entity;
pub mod envelope;
pub mod keys;
pub mod kv;
pub mod query;
pub mod relationship;
pub mod tag;

pub use engine::{Engine, EngineOptions};
pub use kv::{KvRead, ReadTxn, Store, StoreOptions, WriteTxn};
pub use query::{Callable, always, callback};
pub use relationship::{Related, Relation, RelationKind};
pub use tag::TagSpec;
