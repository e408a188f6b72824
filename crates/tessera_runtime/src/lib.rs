//! Configuration, logging, store lifecycle and the inspection console for Tessera.
//!
//! This crate provides:
//! - [`Config`] - Settings with defaults and environment overrides
//! - [`logging`] - `tracing` subscriber setup
//! - [`Runtime`] - Opens the store once at startup and closes it at shutdown
//! - [`Console`] - Line-oriented console for inspecting and editing a store

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod console;
pub mod editor;
pub mod logging;
pub mod runtime;

pub use config::Config;
pub use console::Console;
pub use editor::{LineEditor, ReadResult, RustylineEditor};
pub use runtime::Runtime;
