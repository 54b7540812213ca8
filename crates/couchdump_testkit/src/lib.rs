//! # couchdump Testkit
//!
//! Test utilities for couchdump.
//!
//! This crate provides:
//! - [`FakeCouch`], an in-memory database server reachable through the
//!   `HttpClient` trait, with revision histories and a request log
//! - Fixtures for populated databases and dump files on disk
//! - Property-based generators for command-line token lists
//!
//! ## Usage
//!
//! ```rust,ignore
//! use couchdump_testkit::prelude::*;
//!
//! #[test]
//! fn dumps_everything() {
//!     let fake = FakeCouch::new();
//!     sample_database(&fake, "source");
//!     // ... run the dumper against &fake
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fake;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fake::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fake::*;
pub use fixtures::*;
pub use generators::*;
