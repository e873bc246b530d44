//! Shared helpers for the alumni integration tests.
//!
//! - [`harness`]: a temporary data directory with a file-backed store
//! - [`builders`]: fluent builders that seed records through the services

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
