//! Shared test utilities for batchsort integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs over a temp data root and an in-memory database
//! - Builders for rules and submissions

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
