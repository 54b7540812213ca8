//! Typed wrapper over the database HTTP endpoints the tools use.

use crate::config::ConnectionConfig;
use crate::error::{CoreError, CoreResult};
use crate::model::{AllDocs, DatabaseInfo, DocumentRevisions};
use couchdump_http::{HttpClient, HttpRequest, HttpResponse, Method};
use serde_json::Value;
use tracing::debug;

/// One database on one server.
pub struct CouchDb<C: HttpClient> {
    client: C,
    connection: ConnectionConfig,
}

impl<C: HttpClient> CouchDb<C> {
    /// Creates a handle; no request is made.
    pub fn new(client: C, connection: ConnectionConfig) -> Self {
        Self { client, connection }
    }

    /// Returns the connection this handle talks to.
    pub fn connection(&self) -> &ConnectionConfig {
        &self.connection
    }

    fn database(&self) -> &str {
        &self.connection.database
    }

    fn document_url(&self, id: &str, query: &str) -> String {
        format!(
            "{}{}?{}",
            self.connection.database_url(),
            urlencoding::encode(id),
            query
        )
    }

    fn send(&self, request: HttpRequest) -> CoreResult<HttpResponse> {
        Ok(self.client.send(request)?)
    }

    fn get(&self, url: &str) -> CoreResult<HttpResponse> {
        Ok(self.client.get(url)?)
    }

    fn expect_status(response: &HttpResponse, expected: u16, action: String) -> CoreResult<()> {
        if response.status == expected {
            Ok(())
        } else {
            Err(CoreError::unexpected_status(
                action,
                response.status,
                response.text(),
            ))
        }
    }

    /// `GET /{db}/_all_docs`.
    pub fn all_docs(&self) -> CoreResult<AllDocs> {
        let action = format!("fetching all documents info from db '{}'", self.database());
        let url = format!("{}_all_docs", self.connection.database_url());
        let response = self.get(&url)?;
        Self::expect_status(&response, 200, action.clone())?;
        response
            .json()
            .map_err(|e| CoreError::malformed(action, e))
    }

    /// `GET /{db}/{id}?revs=true&revs_info=true`.
    pub fn document_revisions(&self, id: &str) -> CoreResult<DocumentRevisions> {
        let action = format!("fetching document [{id}] from db '{}'", self.database());
        let response = self.get(&self.document_url(id, "revs=true&revs_info=true"))?;
        Self::expect_status(&response, 200, action.clone())?;

        match response.json::<Value>() {
            Ok(Value::Object(body)) => {
                DocumentRevisions::from_body(body).map_err(|e| CoreError::malformed(action, e))
            }
            Ok(_) => Err(CoreError::malformed(action, "document is not a JSON object")),
            Err(e) => Err(CoreError::malformed(action, e)),
        }
    }

    /// `GET /{db}/{id}?revs=true&rev={rev}`, returning the body text as
    /// received (trimmed).
    ///
    /// The body must be a JSON object carrying `_id` and `_rev`.
    pub fn document_revision(&self, id: &str, rev: &str) -> CoreResult<String> {
        let action = format!(
            "fetching document [{id}] revision [{rev}] from db '{}'",
            self.database()
        );
        let query = format!("revs=true&rev={}", urlencoding::encode(rev));
        let response = self.get(&self.document_url(id, &query))?;
        Self::expect_status(&response, 200, action.clone())?;

        let text = response.text();
        let value: Value =
            serde_json::from_str(&text).map_err(|e| CoreError::malformed(action.clone(), e))?;
        let is_document = value
            .as_object()
            .is_some_and(|body| body.contains_key("_id") && body.contains_key("_rev"));
        if !is_document {
            return Err(CoreError::malformed(
                action,
                "revision body is not a JSON object with _id and _rev",
            ));
        }
        Ok(text)
    }

    /// `GET /{db}/`. Returns `None` when the database does not exist.
    pub fn database_info(&self) -> CoreResult<Option<DatabaseInfo>> {
        let action = format!("checking db '{}' status", self.database());
        let response = self.get(&self.connection.database_url())?;
        match response.status {
            200 => response
                .json()
                .map(Some)
                .map_err(|e| CoreError::malformed(action, e)),
            404 => Ok(None),
            status => Err(CoreError::unexpected_status(action, status, response.text())),
        }
    }

    /// `DELETE /{db}/`, expecting 200.
    pub fn delete_database(&self) -> CoreResult<()> {
        let response = self.send(HttpRequest::new(
            Method::Delete,
            self.connection.database_url(),
        ))?;
        Self::expect_status(
            &response,
            200,
            format!("deleting db '{}'", self.database()),
        )
    }

    /// `PUT /{db}/`, expecting 201.
    pub fn create_database(&self) -> CoreResult<()> {
        let response = self.send(HttpRequest::new(
            Method::Put,
            self.connection.database_url(),
        ))?;
        Self::expect_status(
            &response,
            201,
            format!("creating db '{}'", self.database()),
        )
    }

    /// `POST /{db}/_bulk_docs` with the payload unmodified.
    ///
    /// Any 2xx status is accepted; the decoded response body is returned.
    pub fn bulk_docs(&self, payload: Vec<u8>) -> CoreResult<Value> {
        let url = format!("{}_bulk_docs", self.connection.database_url());
        let action = format!("posting data to \"{url}\"");
        debug!(bytes = payload.len(), %url, "posting bulk payload");

        let request = HttpRequest::new(Method::Post, url)
            .with_header("Content-Type", "application/json")
            .with_body(payload);
        let response = self.send(request)?;
        if !response.is_success() {
            return Err(CoreError::unexpected_status(
                action,
                response.status,
                response.text(),
            ));
        }
        response
            .json()
            .map_err(|e| CoreError::malformed(action, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use couchdump_testkit::FakeCouch;
    use serde_json::json;

    fn couch<'a>(fake: &'a FakeCouch, db: &str) -> CouchDb<&'a FakeCouch> {
        CouchDb::new(fake, ConnectionConfig::new(db))
    }

    #[test]
    fn all_docs_lists_live_documents() {
        let fake = FakeCouch::new();
        fake.create_db("db");
        fake.put_doc("db", json!({"_id": "a", "v": 1}));
        fake.put_doc("db", json!({"_id": "b", "v": 1}));
        fake.delete_doc("db", "b");

        let all_docs = couch(&fake, "db").all_docs().unwrap();
        let ids: Vec<_> = all_docs.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn all_docs_missing_database() {
        let fake = FakeCouch::new();
        let err = couch(&fake, "nope").all_docs().unwrap_err();
        assert!(matches!(err, CoreError::UnexpectedStatus { status: 404, .. }));
    }

    #[test]
    fn document_ids_are_encoded() {
        let fake = FakeCouch::new();
        fake.create_db("db");
        fake.put_doc("db", json!({"_id": "_design/app", "views": {}}));

        let doc = couch(&fake, "db").document_revisions("_design/app").unwrap();
        assert_eq!(doc.body["_id"], "_design/app");
        assert_eq!(doc.revs_info.len(), 1);

        let paths = fake.request_paths();
        assert_eq!(paths, vec!["GET /db/_design%2Fapp?revs=true&revs_info=true"]);
    }

    #[test]
    fn revision_body_must_be_a_document() {
        let fake = FakeCouch::new();
        fake.respond_with(Method::Get, "/db/a", 200, "[1,2,3]");

        let err = couch(&fake, "db").document_revision("a", "1-x").unwrap_err();
        assert!(matches!(err, CoreError::MalformedResponse { .. }));
    }

    #[test]
    fn database_info_statuses() {
        let fake = FakeCouch::new();
        assert_eq!(couch(&fake, "db").database_info().unwrap(), None);

        fake.create_db("db");
        fake.put_doc("db", json!({"_id": "a"}));
        let info = couch(&fake, "db").database_info().unwrap().unwrap();
        assert_eq!(info.doc_count, 1);

        fake.respond_with(Method::Get, "/db/", 500, "{\"error\":\"oops\"}");
        let err = couch(&fake, "db").database_info().unwrap_err();
        assert!(matches!(
            err,
            CoreError::UnexpectedStatus { status: 500, ref body, .. } if body.contains("oops")
        ));
    }

    #[test]
    fn create_and_delete_expect_exact_statuses() {
        let fake = FakeCouch::new();
        let db = couch(&fake, "db");
        db.create_database().unwrap();
        assert!(fake.has_db("db"));

        let err = db.create_database().unwrap_err();
        assert!(matches!(err, CoreError::UnexpectedStatus { status: 412, .. }));

        db.delete_database().unwrap();
        assert!(!fake.has_db("db"));
    }

    #[test]
    fn bulk_docs_sends_json_content_type() {
        let fake = FakeCouch::new();
        fake.create_db("db");
        let payload = br#"{"new_edits":false,"docs":[{"_id":"a","_rev":"1-x"}]}"#.to_vec();

        let response = couch(&fake, "db").bulk_docs(payload.clone()).unwrap();
        assert!(response.is_array());

        let request = fake.last_request().unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(request.body.as_deref(), Some(payload.as_slice()));
    }
}
