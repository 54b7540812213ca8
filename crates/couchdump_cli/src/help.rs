//! Banners and help text.

use couchdump_core::{DEFAULT_HOST, DEFAULT_PORT};

/// Version shown in banners.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the dump binary.
pub const DUMP_BIN: &str = "couchdb-dump";

/// Name of the restore binary.
pub const RESTORE_BIN: &str = "couchdb-restore";

/// First line printed by `couchdb-dump`.
pub fn dump_banner() -> String {
    format!("COUCH DB DUMPER | version: {VERSION}")
}

/// First line printed by `couchdb-restore`.
pub fn restore_banner() -> String {
    format!("COUCH DB RESTORER | version: {VERSION}")
}

fn common_options() -> String {
    format!(
        "   -h                 Display this help message.
   -e                 Print debug diagnostics.
   -H <HOSTNAME>      Hostname or IP of CouchDB server (default: '{DEFAULT_HOST}').
   -p <PORT>          Port of CouchDB server (default: {DEFAULT_PORT})."
    )
}

/// Help for `couchdb-dump`.
pub fn dump_help() -> String {
    format!(
        "   This tool dumps available documents it can find using _all_docs request to CouchDB.
   Dump format is compatible with _bulk_docs feature in CouchDB.

OPTIONS:
{}
   -d <DATABASE>      Database to dump.

USAGE:
   {DUMP_BIN} -H localhost -p 5984 -d test > dump.json",
        common_options()
    )
}

/// Help for `couchdb-restore`.
pub fn restore_help() -> String {
    format!(
        "   This tool restores provided JSON dump using _bulk_docs feature in CouchDB.

OPTIONS:
{}
   -d <DATABASE>      Database to restore.
   -f <FILENAME>      JSON file to restore.
   -D                 Drop and create database, if needed (default: create db, only if it does not exist).
   -F                 Force restore on existing db with documents.

WARNING:
   Please note, that it is not a good idea to restore dump on existing database with documents.

USAGE:
   {RESTORE_BIN} -H localhost -p 5984 -d test -f dump.json",
        common_options()
    )
}
