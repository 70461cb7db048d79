//! Test Helper Utilities
//!
//! Shared utilities for testing riskreg-ingest

#![allow(dead_code)]

pub mod fake_extractor;
pub mod register_utils;

// Re-export commonly used items
pub use fake_extractor::FakeExtractor;
pub use register_utils::{read_rows, reconciler_for, temp_registry, test_app};
