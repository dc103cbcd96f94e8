//! Integration test common infrastructure.
//!
//! Provides a populated in-memory platform wired to an engine, and helpers
//! that feed it events the same way the replay binary does.

pub mod lab;

#[allow(unused_imports)]
pub use lab::*;
