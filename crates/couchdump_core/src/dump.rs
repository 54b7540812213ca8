//! Database dump.
//!
//! Walks every document and its revision history and streams the available
//! revision bodies as one JSON object suitable for `_bulk_docs` with
//! `new_edits: false`:
//!
//! ```text
//! {"new_edits":false,"docs":[
//! {"_id":"a","_rev":"1-x",...},
//! {"_id":"a","_rev":"2-y",...}
//! ]}
//! ```

use crate::config::DumpConfig;
use crate::couch::CouchDb;
use crate::error::{CoreError, CoreResult};
use crate::model::{DocumentRevisions, RevisionStatus};
use couchdump_http::HttpClient;
use serde_json::Value;
use std::io::Write;
use tracing::{info, warn};

/// Opening of the dump envelope, including the trailing newline.
pub const ENVELOPE_OPEN: &str = "{\"new_edits\":false,\"docs\":[\n";

/// Separator written before every entry except the first.
pub const ENTRY_SEPARATOR: &str = ", \n";

/// Closing of the dump envelope.
pub const ENVELOPE_CLOSE: &str = "\n]}\n";

/// Counters collected while dumping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpStats {
    /// Documents listed by `_all_docs`.
    pub documents: usize,
    /// Bodies written to the output.
    pub written: usize,
    /// Revisions skipped because their body was compacted away.
    pub skipped_missing: usize,
    /// Revisions skipped because they are deletion tombstones.
    pub skipped_deleted: usize,
    /// Revisions skipped because of an unrecognised status.
    pub skipped_unknown: usize,
}

impl DumpStats {
    /// Total revisions skipped for any reason.
    pub fn skipped(&self) -> usize {
        self.skipped_missing + self.skipped_deleted + self.skipped_unknown
    }
}

/// Streams a database into a writer.
pub struct Dumper<C: HttpClient> {
    couch: CouchDb<C>,
}

impl<C: HttpClient> Dumper<C> {
    /// Creates a dumper for the configured database.
    pub fn new(client: C, config: DumpConfig) -> Self {
        Self {
            couch: CouchDb::new(client, config.connection),
        }
    }

    /// Dumps every document to `out`.
    ///
    /// Nothing is written if the database has no documents. Once the
    /// envelope is open, a failure leaves the partial output in place.
    pub fn run<W: Write>(&self, out: &mut W) -> CoreResult<DumpStats> {
        let connection = self.couch.connection();
        info!(
            "Fetching all documents info from db '{}' at {} ...",
            connection.database,
            connection.address()
        );

        let all_docs = self.couch.all_docs()?;
        if all_docs.rows.is_empty() {
            return Err(CoreError::NoDocuments {
                database: connection.database.clone(),
            });
        }

        out.write_all(ENVELOPE_OPEN.as_bytes())?;
        info!("Found {} documents...", all_docs.rows.len());

        let mut writer = EntryWriter::new(out);
        let mut stats = DumpStats {
            documents: all_docs.rows.len(),
            ..DumpStats::default()
        };

        for row in &all_docs.rows {
            let doc = self.couch.document_revisions(&row.id)?;
            if doc.revs_info.len() > 1 {
                self.dump_history(&row.id, &doc, &mut writer, &mut stats)?;
            } else {
                info!("[{}]", row.id);
                writer.entry(&self.current_body(&row.id, doc)?)?;
                stats.written += 1;
            }
            writer.flush()?;
        }

        writer.finish()?;
        info!(
            documents = stats.documents,
            written = stats.written,
            skipped = stats.skipped(),
            "dump complete"
        );
        Ok(stats)
    }

    /// Serializes the latest body, already stripped of `_revs_info`.
    ///
    /// The body must carry `_id` and `_rev`.
    fn current_body(&self, id: &str, doc: DocumentRevisions) -> CoreResult<String> {
        if !(doc.body.contains_key("_id") && doc.body.contains_key("_rev")) {
            return Err(CoreError::malformed(
                format!(
                    "fetching document [{id}] from db '{}'",
                    self.couch.connection().database
                ),
                "document body has no _id and _rev",
            ));
        }
        Ok(Value::Object(doc.body).to_string())
    }

    fn dump_history<W: Write>(
        &self,
        id: &str,
        doc: &DocumentRevisions,
        writer: &mut EntryWriter<'_, W>,
        stats: &mut DumpStats,
    ) -> CoreResult<()> {
        for revision in doc.oldest_first() {
            match &revision.status {
                RevisionStatus::Available => {
                    info!("[{id}] @ {}", revision.rev);
                    let body = self.couch.document_revision(id, &revision.rev)?;
                    writer.entry(&body)?;
                    stats.written += 1;
                }
                RevisionStatus::Missing => {
                    info!("[{id}] @ {} = missing", revision.rev);
                    stats.skipped_missing += 1;
                }
                // _all_docs never lists deleted documents, so a live
                // document should not report a deleted revision.
                RevisionStatus::Deleted => {
                    warn!("[{id}] @ {} = deleted", revision.rev);
                    stats.skipped_deleted += 1;
                }
                RevisionStatus::Unknown(_) => {
                    warn!("[{id}] @ {} = {}", revision.rev, revision.status);
                    stats.skipped_unknown += 1;
                }
            }
        }
        Ok(())
    }
}

/// Writes entries with separators between them.
struct EntryWriter<'a, W: Write> {
    out: &'a mut W,
    first: bool,
}

impl<'a, W: Write> EntryWriter<'a, W> {
    fn new(out: &'a mut W) -> Self {
        Self { out, first: true }
    }

    fn entry(&mut self, body: &str) -> CoreResult<()> {
        if !self.first {
            self.out.write_all(ENTRY_SEPARATOR.as_bytes())?;
        }
        self.first = false;
        self.out.write_all(body.as_bytes())?;
        Ok(())
    }

    fn flush(&mut self) -> CoreResult<()> {
        self.out.flush()?;
        Ok(())
    }

    fn finish(self) -> CoreResult<()> {
        self.out.write_all(ENVELOPE_CLOSE.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;
    use couchdump_http::Method;
    use couchdump_testkit::FakeCouch;
    use serde_json::json;

    fn dump(fake: &FakeCouch, db: &str) -> (CoreResult<DumpStats>, String) {
        let dumper = Dumper::new(fake, DumpConfig::new(ConnectionConfig::new(db)));
        let mut out = Vec::new();
        let result = dumper.run(&mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn single_revision_is_reserialized() {
        let fake = FakeCouch::new();
        let rev = fake.put_doc("db", json!({"_id": "a/b", "name": "žába", "z": 1, "a": 2}));

        let (result, output) = dump(&fake, "db");
        let stats = result.unwrap();
        assert_eq!(stats.written, 1);

        let expected = format!(
            "{ENVELOPE_OPEN}{{\"_id\":\"a/b\",\"_rev\":\"{rev}\",\"name\":\"žába\",\"z\":1,\"a\":2,\"_revisions\":{{\"start\":1,\"ids\":[\"{}\"]}}}}{ENVELOPE_CLOSE}",
            rev.split_once('-').unwrap().1
        );
        assert_eq!(output, expected);
    }

    #[test]
    fn history_keeps_available_revisions_oldest_first() {
        let fake = FakeCouch::new();
        let rev1 = fake.put_doc("db", json!({"_id": "a", "n": 1}));
        let rev2 = fake.put_doc("db", json!({"_id": "a", "n": 2}));
        let rev3 = fake.put_doc("db", json!({"_id": "a", "n": 3}));
        fake.set_revision_status("db", "a", &rev2, "missing");

        let (result, output) = dump(&fake, "db");
        let stats = result.unwrap();
        assert_eq!(stats.written, 2);
        assert_eq!(stats.skipped_missing, 1);

        let parsed: Value = serde_json::from_str(&output).unwrap();
        let revs: Vec<_> = parsed["docs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["_rev"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(revs, vec![rev1, rev3]);
        assert!(output.contains(ENTRY_SEPARATOR));
    }

    #[test]
    fn deleted_and_unknown_revisions_are_skipped() {
        let fake = FakeCouch::new();
        let rev1 = fake.put_doc("db", json!({"_id": "a", "n": 1}));
        let rev2 = fake.put_doc("db", json!({"_id": "a", "n": 2}));
        fake.put_doc("db", json!({"_id": "a", "n": 3}));
        fake.set_revision_status("db", "a", &rev1, "deleted");
        fake.set_revision_status("db", "a", &rev2, "conflicted");

        let (result, _) = dump(&fake, "db");
        let stats = result.unwrap();
        assert_eq!(stats.written, 1);
        assert_eq!(stats.skipped_deleted, 1);
        assert_eq!(stats.skipped_unknown, 1);
        assert_eq!(stats.skipped(), 2);
    }

    #[test]
    fn empty_database_writes_nothing() {
        let fake = FakeCouch::new();
        fake.create_db("db");

        let (result, output) = dump(&fake, "db");
        assert!(matches!(result, Err(CoreError::NoDocuments { ref database }) if database == "db"));
        assert!(output.is_empty());
    }

    #[test]
    fn single_revision_without_identity_is_malformed() {
        let fake = FakeCouch::new();
        fake.respond_with(
            Method::Get,
            "/db/_all_docs",
            200,
            r#"{"total_rows":1,"offset":0,"rows":[{"id":"a","key":"a","value":{"rev":"1-x"}}]}"#,
        );
        fake.respond_with(Method::Get, "/db/a", 200, r#"{"foo":1}"#);

        let (result, output) = dump(&fake, "db");
        assert!(matches!(
            result,
            Err(CoreError::MalformedResponse { ref action, .. }) if action.contains("[a]")
        ));
        assert!(!output.contains("foo"));
    }

    #[test]
    fn failed_revision_fetch_keeps_partial_output() {
        let fake = FakeCouch::new();
        fake.put_doc("db", json!({"_id": "a"}));
        fake.put_doc("db", json!({"_id": "b", "n": 1}));
        fake.put_doc("db", json!({"_id": "b", "n": 2}));
        fake.respond_with(Method::Get, "/db/b", 500, "{}");

        let (result, output) = dump(&fake, "db");
        assert!(matches!(
            result,
            Err(CoreError::UnexpectedStatus { status: 500, .. })
        ));
        assert!(output.starts_with(ENVELOPE_OPEN));
        assert!(!output.ends_with(ENVELOPE_CLOSE));
    }
}
