//! Shared test utilities for notesync integration tests.
//!
//! `TestHarness` runs commands against in-memory mail, storage, download and
//! completion services.

pub mod harness;

pub use harness::*;
