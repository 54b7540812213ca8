//! # couchdump CLI
//!
//! Command-line front ends for dumping and restoring CouchDB databases.
//!
//! This crate provides:
//! - `couchdb-dump`, which writes every available revision of every
//!   document to stdout as a `_bulk_docs` payload
//! - `couchdb-restore`, which posts such a payload into a database
//! - Logging setup, banners and help text shared by both
//!
//! Both binaries are thin wrappers over [`commands::dump::run`] and
//! [`commands::restore::run`], which return an [`ExitKind`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod commands;
pub mod help;
pub mod logging;

pub use couchdump_core::ExitKind;
