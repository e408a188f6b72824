//! Integration tests for Layer 2: Runtime
//!
//! Tests for configuration, the store lifecycle, and the console.

mod console;
