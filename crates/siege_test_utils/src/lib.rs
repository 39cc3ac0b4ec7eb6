//! # Siege Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Fixture catalog and ASCII map game builder
//! - Scripted random source
//! - Determinism test harness
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;
pub mod random;

/// Re-export proptest for convenience.
pub use proptest;
