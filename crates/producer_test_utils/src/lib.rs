//! # Producer Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Determinism test harness
//! - Snapshot and location fixtures
//! - In-memory collaborators that record what the scheduler issues
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;
pub mod world;

/// Re-export proptest for convenience.
pub use proptest;
