//! Tessera - Entity, tag and relationship storage
//!
//! This crate re-exports all layers of the Tessera system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: tessera_runtime    - Config, logging, store lifecycle, console
//! Layer 1: tessera_storage    - KV store, key codec, entities, tags, relationships, queries
//! Layer 0: tessera_foundation - Core types (Value, EntityId, Entity, Error)
//! ```

pub use tessera_foundation as foundation;
pub use tessera_runtime as runtime;
pub use tessera_storage as storage;
