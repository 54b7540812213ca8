//! Shapes of the database API responses.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::fmt;

/// Field holding the revision list in `?revs_info=true` responses.
pub const REVS_INFO_FIELD: &str = "_revs_info";

/// Response of `GET /{db}/_all_docs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AllDocs {
    /// One row per live document.
    #[serde(default)]
    pub rows: Vec<AllDocsRow>,
}

/// One row of an `_all_docs` listing.
#[derive(Debug, Clone, Deserialize)]
pub struct AllDocsRow {
    /// Document ID.
    pub id: String,
}

/// Availability of one revision of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionStatus {
    /// Body can be fetched.
    Available,
    /// Body was compacted away.
    Missing,
    /// Revision is a deletion tombstone.
    Deleted,
    /// A status this tool does not know about.
    Unknown(String),
}

impl RevisionStatus {
    /// Maps a status string from the API.
    pub fn parse(status: &str) -> Self {
        match status {
            "available" => RevisionStatus::Available,
            "missing" => RevisionStatus::Missing,
            "deleted" => RevisionStatus::Deleted,
            other => RevisionStatus::Unknown(other.to_string()),
        }
    }
}

impl Default for RevisionStatus {
    fn default() -> Self {
        RevisionStatus::Unknown(String::new())
    }
}

impl fmt::Display for RevisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevisionStatus::Available => f.write_str("available"),
            RevisionStatus::Missing => f.write_str("missing"),
            RevisionStatus::Deleted => f.write_str("deleted"),
            RevisionStatus::Unknown(status) => write!(f, "unsupported revision status '{status}'"),
        }
    }
}

impl<'de> Deserialize<'de> for RevisionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let status = String::deserialize(deserializer)?;
        Ok(Self::parse(&status))
    }
}

/// One entry of `_revs_info`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RevisionInfo {
    /// Revision token, `<sequence>-<hash>`.
    pub rev: String,
    /// Availability; an absent status is unknown.
    #[serde(default)]
    pub status: RevisionStatus,
}

/// A document fetched with `?revs=true&revs_info=true`.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRevisions {
    /// Latest body with `_revs_info` removed.
    pub body: Map<String, Value>,
    /// Revision list, newest first as returned by the API.
    pub revs_info: Vec<RevisionInfo>,
}

impl DocumentRevisions {
    /// Splits the revision list off a fetched document body.
    pub fn from_body(mut body: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let revs_info = match body.shift_remove(REVS_INFO_FIELD) {
            Some(value) => serde_json::from_value(value)?,
            None => Vec::new(),
        };
        Ok(Self { body, revs_info })
    }

    /// Returns the revision list oldest first.
    pub fn oldest_first(&self) -> impl Iterator<Item = &RevisionInfo> {
        self.revs_info.iter().rev()
    }
}

/// Response of `GET /{db}/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DatabaseInfo {
    /// Number of live documents; absent counts as zero.
    #[serde(default)]
    pub doc_count: u64,
}

/// A document the bulk write rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    /// Document ID, or `?` when the server did not report one.
    pub id: String,
    /// Reason, falling back to the error code.
    pub reason: String,
}

impl BulkFailure {
    /// Extracts a failure from one element of a `_bulk_docs` response.
    ///
    /// Returns `None` for successful outcomes (no `error` field, or a null
    /// one).
    pub fn from_outcome(outcome: &Value) -> Option<Self> {
        let error = outcome.get("error").filter(|e| !e.is_null())?;
        let id = outcome
            .get("id")
            .filter(|id| !id.is_null())
            .map(json_text)
            .unwrap_or_else(|| "?".to_string());
        let reason = outcome
            .get("reason")
            .filter(|reason| !reason.is_null())
            .map(json_text)
            .unwrap_or_else(|| json_text(error));
        Some(Self { id, reason })
    }
}

fn json_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn all_docs_without_rows() {
        let all_docs: AllDocs = serde_json::from_value(json!({"total_rows": 0})).unwrap();
        assert!(all_docs.rows.is_empty());
    }

    #[test]
    fn revision_status_parsing() {
        assert_eq!(RevisionStatus::parse("available"), RevisionStatus::Available);
        assert_eq!(RevisionStatus::parse("missing"), RevisionStatus::Missing);
        assert_eq!(RevisionStatus::parse("deleted"), RevisionStatus::Deleted);
        assert_eq!(
            RevisionStatus::parse("conflicted"),
            RevisionStatus::Unknown("conflicted".into())
        );
    }

    #[test]
    fn document_revisions_split() {
        let body = json!({
            "_id": "doc",
            "_rev": "2-b",
            "_revs_info": [
                {"rev": "2-b", "status": "available"},
                {"rev": "1-a", "status": "missing"}
            ],
            "name": "x"
        });
        let Value::Object(body) = body else {
            unreachable!()
        };

        let doc = DocumentRevisions::from_body(body).unwrap();
        assert!(!doc.body.contains_key(REVS_INFO_FIELD));
        assert_eq!(doc.body.keys().collect::<Vec<_>>(), vec!["_id", "_rev", "name"]);

        let revs: Vec<_> = doc.oldest_first().map(|r| r.rev.as_str()).collect();
        assert_eq!(revs, vec!["1-a", "2-b"]);
        assert_eq!(doc.revs_info[1].status, RevisionStatus::Missing);
    }

    #[test]
    fn revision_without_status_is_unknown() {
        let Value::Object(body) = json!({
            "_id": "doc",
            "_rev": "2-b",
            "_revs_info": [{"rev": "2-b", "status": "available"}, {"rev": "1-a"}]
        }) else {
            unreachable!()
        };

        let doc = DocumentRevisions::from_body(body).unwrap();
        assert_eq!(doc.revs_info[1].status, RevisionStatus::Unknown(String::new()));
    }

    #[test]
    fn bulk_failure_extraction() {
        assert_eq!(BulkFailure::from_outcome(&json!({"id": "a", "rev": "1-x", "ok": true})), None);
        assert_eq!(BulkFailure::from_outcome(&json!({"id": "a", "error": null})), None);

        assert_eq!(
            BulkFailure::from_outcome(&json!({"id": "a", "error": "conflict", "reason": "Document update conflict."})),
            Some(BulkFailure {
                id: "a".into(),
                reason: "Document update conflict.".into()
            })
        );
        assert_eq!(
            BulkFailure::from_outcome(&json!({"error": "forbidden"})),
            Some(BulkFailure {
                id: "?".into(),
                reason: "forbidden".into()
            })
        );
    }

    #[test]
    fn database_info_default_count() {
        let info: DatabaseInfo = serde_json::from_value(json!({"db_name": "x"})).unwrap();
        assert_eq!(info.doc_count, 0);
    }
}
