//! # KomalDB Testkit
//!
//! Test utilities for KomalDB.
//!
//! This crate provides:
//! - Test fixtures and database helpers
//! - Property-based test generators using proptest
//! - A reference model for checking operation sequences
//! - Stress runners for concurrent access
//!
//! ## Usage
//!
//! ```
//! use komaldb_testkit::prelude::*;
//!
//! with_temp_db(|db| {
//!     db.set("k", 1).unwrap();
//!     assert_eq!(db.len(), 1);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use stress::*;
