//! # couchdump Core
//!
//! Dump and restore orchestration for CouchDB databases.
//!
//! This crate provides:
//! - A small command-line argument parser shared by both tools
//! - Connection, dump and restore configuration with usage validation
//! - A typed wrapper over the database HTTP endpoints
//! - [`Dumper`], which streams every available revision as a bulk payload
//! - [`Restorer`], which replays such a payload into a database
//! - The error taxonomy and its mapping onto process exit codes
//!
//! Everything talks HTTP through [`couchdump_http::HttpClient`], so the
//! orchestrators run unchanged against an in-memory server in tests.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod args;
pub mod config;
pub mod couch;
pub mod dump;
pub mod error;
pub mod model;
pub mod restore;

pub use args::{parse_args, OptionValue, ParsedArgs};
pub use config::{ConnectionConfig, DumpConfig, RestoreConfig, DEFAULT_HOST, DEFAULT_PORT};
pub use couch::CouchDb;
pub use dump::{DumpStats, Dumper};
pub use error::{CoreError, CoreResult, ExitKind};
pub use model::{BulkFailure, DatabaseInfo, RevisionStatus};
pub use restore::{RestoreReport, Restorer};
