//! # Replica Testkit
//!
//! Test utilities for Replica.
//!
//! This crate provides:
//! - Canonical fixture schemas (project/task) and record builders
//! - An engine harness wired to in-memory stores and scripted
//!   transports
//! - Property-based generators for field values and records using
//!   proptest
//!
//! ## Usage
//!
//! ```rust
//! use replica_testkit::prelude::*;
//!
//! let harness = EngineHarness::new();
//! harness.engine.download_blocking(true, WAIT).unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod scenarios;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::scenarios::*;
}

pub use fixtures::*;
pub use generators::*;
pub use scenarios::*;
