//! Core values, entity identifiers, projections and errors for Tessera.
//!
//! This crate provides:
//! - [`Value`] - The dynamic value type stored in components and relationship metadata
//! - [`EntityId`] - Opaque, globally unique entity identifiers
//! - [`Entity`] - The materialized projection of an entity (`{..fields, id}`)
//! - [`Error`] - Error types with a category per failure class
//! - Persistent collections ([`LtVec`], [`LtMap`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod collections;
mod entity;
mod error;
mod projection;
mod types;
mod value;

pub use collections::{LtMap, LtVec};
pub use entity::EntityId;
pub use error::{Error, ErrorCategory, ErrorContext, ErrorKind, Result};
pub use projection::{Entity, EntityRef, ID_FIELD};
pub use types::Type;
pub use value::Value;
