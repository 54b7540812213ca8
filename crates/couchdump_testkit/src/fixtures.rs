//! Test fixtures and server helpers.
//!
//! Provides a populated sample database and dump files on disk.

use crate::fake::FakeCouch;
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;

/// Server address the fixtures assume; the fake ignores it.
pub const TEST_HOST: &str = "localhost";

/// Port matching [`TEST_HOST`].
pub const TEST_PORT: u16 = 5984;

/// Revisions of one document in [`sample_database`], oldest first.
#[derive(Debug, Clone)]
pub struct SampleDocument {
    /// Document ID.
    pub id: &'static str,
    /// Revision tokens, oldest first.
    pub revs: Vec<String>,
}

/// Fills `db` with documents that exercise the dumper:
///
/// - `alpha`, three revisions
/// - `_design/app`, a design document whose ID needs URL encoding
/// - `ünïcode`, one revision with non-ASCII content
/// - `gone`, created then deleted, so it is absent from listings
///
/// Returns the live documents in ID order.
pub fn sample_database(fake: &FakeCouch, db: &str) -> Vec<SampleDocument> {
    fake.create_db(db);

    let alpha = vec![
        fake.put_doc(db, json!({"_id": "alpha", "count": 1})),
        fake.put_doc(db, json!({"_id": "alpha", "count": 2, "tags": ["a"]})),
        fake.put_doc(db, json!({"_id": "alpha", "count": 3, "tags": ["a", "b"]})),
    ];
    let design = vec![fake.put_doc(
        db,
        json!({"_id": "_design/app", "views": {"all": {"map": "function(doc) { emit(doc._id); }"}}}),
    )];
    let unicode = vec![fake.put_doc(db, json!({"_id": "ünïcode", "text": "žluťoučký kůň"}))];

    fake.put_doc(db, json!({"_id": "gone", "temp": true}));
    fake.delete_doc(db, "gone");

    vec![
        SampleDocument {
            id: "_design/app",
            revs: design,
        },
        SampleDocument {
            id: "alpha",
            revs: alpha,
        },
        SampleDocument {
            id: "ünïcode",
            revs: unicode,
        },
    ]
}

/// Writes `contents` to a fresh temporary file.
pub fn dump_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write dump file");
    file.flush().expect("Failed to flush dump file");
    file
}

/// Formats a command line for one of the tools against the test server.
pub fn connection_args(db: &str) -> Vec<String> {
    vec![
        "-H".to_string(),
        TEST_HOST.to_string(),
        "-p".to_string(),
        TEST_PORT.to_string(),
        "-d".to_string(),
        db.to_string(),
    ]
}
