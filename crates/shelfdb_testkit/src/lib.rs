//! # shelfdb Testkit
//!
//! Test utilities for shelfdb.
//!
//! This crate provides:
//! - Self-cleaning pools and pre-populated databases
//! - Property-based test generators using proptest
//! - Stress helpers for sequential and concurrent load
//!
//! ## Usage
//!
//! ```rust
//! use shelfdb_testkit::prelude::*;
//!
//! with_temp_pool(|pool| {
//!     let conn = scenarios::animals(pool);
//!     assert_eq!(conn.count("animals").unwrap(), scenarios::ANIMALS.len());
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
