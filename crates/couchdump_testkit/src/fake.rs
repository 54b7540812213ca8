//! In-memory database server.
//!
//! [`FakeCouch`] implements `HttpClient` by routing requests to in-memory
//! databases instead of the network, the same way a loopback transport
//! routes to an in-process server. It understands the endpoints the dump
//! and restore tools use, keeps full revision histories, and records every
//! request for later assertions.

use couchdump_http::{HttpClient, HttpError, HttpRequest, HttpResponse, HttpResult, Method};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
struct FakeRevision {
    rev: String,
    status: String,
    body: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
struct FakeDocument {
    /// Oldest first.
    revisions: Vec<FakeRevision>,
}

impl FakeDocument {
    fn latest(&self) -> Option<&FakeRevision> {
        self.revisions.last()
    }

    fn is_live(&self) -> bool {
        self.latest().is_some_and(|r| r.status != "deleted")
    }

    fn next_sequence(&self) -> u64 {
        self.latest().map(|r| rev_sequence(&r.rev)).unwrap_or(0) + 1
    }

    fn position(&self, rev: &str) -> Option<usize> {
        self.revisions.iter().position(|r| r.rev == rev)
    }

    /// `_revisions` for the revision at `index`.
    fn revisions_field(&self, index: usize) -> Value {
        let ids: Vec<&str> = self.revisions[..=index]
            .iter()
            .rev()
            .map(|r| rev_hash(&r.rev))
            .collect();
        json!({
            "start": rev_sequence(&self.revisions[index].rev),
            "ids": ids,
        })
    }

    /// `_revs_info`, newest first.
    fn revs_info_field(&self) -> Value {
        self.revisions
            .iter()
            .rev()
            .map(|r| json!({"rev": r.rev, "status": r.status}))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
struct FakeDatabase {
    docs: BTreeMap<String, FakeDocument>,
}

impl FakeDatabase {
    fn live_count(&self) -> usize {
        self.docs.values().filter(|d| d.is_live()).count()
    }

    fn append(&mut self, id: &str, status: &str, fields: &Map<String, Value>) -> String {
        let doc = self.docs.entry(id.to_string()).or_default();
        let sequence = doc.next_sequence();
        let rev = make_rev(id, sequence, fields);
        let body = document_body(id, &rev, fields);
        doc.revisions.push(FakeRevision {
            rev: rev.clone(),
            status: status.to_string(),
            body,
        });
        rev
    }

    /// Stores a revision exactly as given, the way `new_edits: false` does.
    fn replicate(&mut self, id: &str, rev: &str, fields: &Map<String, Value>) {
        let doc = self.docs.entry(id.to_string()).or_default();
        if doc.position(rev).is_some() {
            return;
        }
        let deleted = fields.get("_deleted") == Some(&Value::Bool(true));
        doc.revisions.push(FakeRevision {
            rev: rev.to_string(),
            status: if deleted { "deleted" } else { "available" }.to_string(),
            body: document_body(id, rev, fields),
        });
        doc.revisions.sort_by_key(|r| rev_sequence(&r.rev));
    }
}

#[derive(Default)]
struct State {
    databases: BTreeMap<String, FakeDatabase>,
    requests: Vec<HttpRequest>,
    overrides: HashMap<(Method, String), (u16, String)>,
    offline: bool,
}

/// An in-memory database server that speaks through `HttpClient`.
#[derive(Default)]
pub struct FakeCouch {
    state: Mutex<State>,
}

impl FakeCouch {
    /// Creates a server with no databases.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty database (no-op if it exists).
    pub fn create_db(&self, db: &str) {
        self.state.lock().databases.entry(db.to_string()).or_default();
    }

    /// Returns true if the database exists.
    pub fn has_db(&self, db: &str) -> bool {
        self.state.lock().databases.contains_key(db)
    }

    /// Stores a new revision of a document, creating the database if
    /// needed. `doc` must be an object with a string `_id`. Returns the new
    /// revision token.
    pub fn put_doc(&self, db: &str, doc: Value) -> String {
        let fields = doc.as_object().cloned().expect("document must be an object");
        let id = fields
            .get("_id")
            .and_then(Value::as_str)
            .expect("document needs a string _id")
            .to_string();
        let mut state = self.state.lock();
        state
            .databases
            .entry(db.to_string())
            .or_default()
            .append(&id, "available", &fields)
    }

    /// Appends a deletion tombstone to a document. Returns its revision.
    pub fn delete_doc(&self, db: &str, id: &str) -> String {
        let mut fields = Map::new();
        fields.insert("_deleted".to_string(), Value::Bool(true));
        let mut state = self.state.lock();
        state
            .databases
            .get_mut(db)
            .expect("database must exist")
            .append(id, "deleted", &fields)
    }

    /// Marks every non-latest available revision as `missing`.
    pub fn compact(&self, db: &str) {
        let mut state = self.state.lock();
        let database = state.databases.get_mut(db).expect("database must exist");
        for doc in database.docs.values_mut() {
            let last = doc.revisions.len().saturating_sub(1);
            for revision in &mut doc.revisions[..last] {
                if revision.status == "available" {
                    revision.status = "missing".to_string();
                }
            }
        }
    }

    /// Overrides the status reported for one revision.
    pub fn set_revision_status(&self, db: &str, id: &str, rev: &str, status: &str) {
        let mut state = self.state.lock();
        let doc = state
            .databases
            .get_mut(db)
            .and_then(|d| d.docs.get_mut(id))
            .expect("document must exist");
        let index = doc.position(rev).expect("revision must exist");
        doc.revisions[index].status = status.to_string();
    }

    /// Returns `(rev, status)` pairs of a document, oldest first.
    pub fn revisions(&self, db: &str, id: &str) -> Vec<(String, String)> {
        let state = self.state.lock();
        state
            .databases
            .get(db)
            .and_then(|d| d.docs.get(id))
            .map(|doc| {
                doc.revisions
                    .iter()
                    .map(|r| (r.rev.clone(), r.status.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the stored body of one revision.
    pub fn revision_body(&self, db: &str, id: &str, rev: &str) -> Option<Value> {
        let state = self.state.lock();
        let doc = state.databases.get(db)?.docs.get(id)?;
        let index = doc.position(rev)?;
        Some(Value::Object(doc.revisions[index].body.clone()))
    }

    /// Returns the latest body of every live document, ordered by ID.
    pub fn docs(&self, db: &str) -> Vec<Value> {
        let state = self.state.lock();
        state
            .databases
            .get(db)
            .map(|d| {
                d.docs
                    .values()
                    .filter(|doc| doc.is_live())
                    .filter_map(|doc| doc.latest())
                    .map(|r| Value::Object(r.body.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the number of live documents.
    pub fn doc_count(&self, db: &str) -> usize {
        self.state
            .lock()
            .databases
            .get(db)
            .map(FakeDatabase::live_count)
            .unwrap_or(0)
    }

    /// Answers every `method` request for `path` (query ignored) with a
    /// canned response instead of routing it.
    pub fn respond_with(&self, method: Method, path: &str, status: u16, body: &str) {
        self.state
            .lock()
            .overrides
            .insert((method, path.to_string()), (status, body.to_string()));
    }

    /// Makes every request fail with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Returns every request received so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().requests.clone()
    }

    /// Returns every request as `METHOD /path?query`.
    pub fn request_paths(&self) -> Vec<String> {
        self.state
            .lock()
            .requests
            .iter()
            .map(|r| format!("{} {}", r.method, path_and_query(&r.url)))
            .collect()
    }

    /// Returns the most recent request.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.state.lock().requests.last().cloned()
    }

    /// Counts requests with the given method whose path (query ignored)
    /// equals `path`.
    pub fn count_requests(&self, method: Method, path: &str) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.method == method && split_path(&r.url).0 == path)
            .count()
    }

    /// Forgets recorded requests.
    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }
}

impl HttpClient for FakeCouch {
    fn send(&self, request: HttpRequest) -> HttpResult<HttpResponse> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());
        if state.offline {
            return Err(HttpError::transport(request.url, "connection refused"));
        }
        Ok(route(&mut state, &request))
    }
}

fn route(state: &mut State, request: &HttpRequest) -> HttpResponse {
    let (path, query) = split_path(&request.url);
    if let Some((status, body)) = state.overrides.get(&(request.method, path.to_string())) {
        return HttpResponse::new(*status, body.clone().into_bytes());
    }

    let segments: Vec<String> = path
        .trim_start_matches('/')
        .split('/')
        .map(decode)
        .collect();
    let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
    let params = parse_query(query);

    match (request.method, segments.as_slice()) {
        (Method::Get, [db] | [db, ""]) => match state.databases.get(*db) {
            Some(database) => json_response(
                200,
                json!({"db_name": db, "doc_count": database.live_count()}),
            ),
            None => db_not_found(),
        },
        (Method::Put, [db] | [db, ""]) => {
            if state.databases.contains_key(*db) {
                json_response(
                    412,
                    json!({"error": "file_exists", "reason": "The database could not be created, the file already exists."}),
                )
            } else {
                state.databases.insert(db.to_string(), FakeDatabase::default());
                json_response(201, json!({"ok": true}))
            }
        }
        (Method::Delete, [db] | [db, ""]) => match state.databases.remove(*db) {
            Some(_) => json_response(200, json!({"ok": true})),
            None => db_not_found(),
        },
        (Method::Get, [db, "_all_docs"]) => match state.databases.get(*db) {
            Some(database) => all_docs(database),
            None => db_not_found(),
        },
        (Method::Post, [db, "_bulk_docs"]) => match state.databases.get_mut(*db) {
            Some(database) => bulk_docs(database, request.body.as_deref().unwrap_or_default()),
            None => db_not_found(),
        },
        (Method::Get, [db, id]) => match state.databases.get(*db) {
            Some(database) => get_document(database, id, &params),
            None => db_not_found(),
        },
        _ => json_response(
            405,
            json!({"error": "method_not_allowed", "reason": "Unsupported by fake server."}),
        ),
    }
}

fn all_docs(database: &FakeDatabase) -> HttpResponse {
    let rows: Vec<Value> = database
        .docs
        .iter()
        .filter(|(_, doc)| doc.is_live())
        .filter_map(|(id, doc)| {
            doc.latest()
                .map(|r| json!({"id": id, "key": id, "value": {"rev": r.rev}}))
        })
        .collect();
    json_response(
        200,
        json!({"total_rows": rows.len(), "offset": 0, "rows": rows}),
    )
}

fn get_document(database: &FakeDatabase, id: &str, params: &HashMap<String, String>) -> HttpResponse {
    let Some(doc) = database.docs.get(id) else {
        return doc_not_found("missing");
    };
    let with_revisions = params.get("revs").is_some_and(|v| v == "true");

    let index = match params.get("rev") {
        Some(rev) => match doc.position(rev) {
            Some(index) if doc.revisions[index].status == "available" => index,
            _ => return doc_not_found("missing"),
        },
        None => {
            if !doc.is_live() {
                return doc_not_found("deleted");
            }
            doc.revisions.len() - 1
        }
    };

    let mut body = doc.revisions[index].body.clone();
    if with_revisions {
        body.insert("_revisions".to_string(), doc.revisions_field(index));
    }
    if params.get("revs_info").is_some_and(|v| v == "true") && !params.contains_key("rev") {
        body.insert("_revs_info".to_string(), doc.revs_info_field());
    }
    json_response(200, Value::Object(body))
}

fn bulk_docs(database: &mut FakeDatabase, payload: &[u8]) -> HttpResponse {
    let Ok(Value::Object(request)) = serde_json::from_slice::<Value>(payload) else {
        return json_response(
            400,
            json!({"error": "bad_request", "reason": "invalid UTF-8 JSON"}),
        );
    };
    let Some(docs) = request.get("docs").and_then(Value::as_array) else {
        return json_response(
            400,
            json!({"error": "bad_request", "reason": "POST body must include `docs` parameter."}),
        );
    };
    let new_edits = request.get("new_edits") != Some(&Value::Bool(false));

    let mut outcomes = Vec::new();
    for doc in docs {
        let Some(fields) = doc.as_object() else {
            outcomes.push(json!({"error": "bad_request", "reason": "Document must be a JSON object"}));
            continue;
        };
        let Some(id) = fields.get("_id").and_then(Value::as_str) else {
            outcomes.push(json!({"error": "bad_request", "reason": "Document id must be a string"}));
            continue;
        };
        if new_edits {
            let rev = database.append(id, "available", fields);
            outcomes.push(json!({"ok": true, "id": id, "rev": rev}));
            continue;
        }
        match fields.get("_rev").and_then(Value::as_str) {
            Some(rev) => database.replicate(id, rev, fields),
            None => outcomes.push(json!({
                "id": id,
                "error": "bad_request",
                "reason": "Document rev is required when new_edits is false"
            })),
        }
    }
    json_response(201, Value::Array(outcomes))
}

fn json_response(status: u16, body: Value) -> HttpResponse {
    HttpResponse::new(status, body.to_string().into_bytes())
}

fn db_not_found() -> HttpResponse {
    json_response(
        404,
        json!({"error": "not_found", "reason": "Database does not exist."}),
    )
}

fn doc_not_found(reason: &str) -> HttpResponse {
    json_response(404, json!({"error": "not_found", "reason": reason}))
}

/// Builds a stored body: `_id`, `_rev`, then the remaining user fields.
fn document_body(id: &str, rev: &str, fields: &Map<String, Value>) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("_id".to_string(), Value::String(id.to_string()));
    body.insert("_rev".to_string(), Value::String(rev.to_string()));
    for (key, value) in fields {
        if !matches!(key.as_str(), "_id" | "_rev" | "_revisions" | "_revs_info") {
            body.insert(key.clone(), value.clone());
        }
    }
    body
}

fn make_rev(id: &str, sequence: u64, fields: &Map<String, Value>) -> String {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    sequence.hash(&mut hasher);
    Value::Object(fields.clone()).to_string().hash(&mut hasher);
    format!("{sequence}-{:016x}", hasher.finish())
}

fn rev_sequence(rev: &str) -> u64 {
    rev.split_once('-')
        .and_then(|(n, _)| n.parse().ok())
        .unwrap_or(0)
}

fn rev_hash(rev: &str) -> &str {
    rev.split_once('-').map(|(_, h)| h).unwrap_or(rev)
}

fn path_and_query(url: &str) -> &str {
    match url.find("://") {
        Some(scheme_end) => {
            let rest = &url[scheme_end + 3..];
            rest.find('/').map(|i| &rest[i..]).unwrap_or("/")
        }
        None => url,
    }
}

fn split_path(url: &str) -> (&str, &str) {
    let path_and_query = path_and_query(url);
    path_and_query
        .split_once('?')
        .unwrap_or((path_and_query, ""))
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect()
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
