//! Request/response types and the client abstraction.

use crate::error::HttpResult;
use serde::de::DeserializeOwned;
use std::fmt;

/// HTTP methods used against the database API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    /// GET (default).
    #[default]
    Get,
    /// PUT.
    Put,
    /// DELETE.
    Delete,
    /// POST.
    Post,
}

impl Method {
    /// Returns the method name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Extra headers as name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Request body, if any.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a request with the given method and URL.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Creates a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the request body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Returns the value of the first header with the given name
    /// (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A received response, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for statuses in `200..=299`.
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Returns the body as text with surrounding whitespace removed.
    ///
    /// Invalid UTF-8 sequences are replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).trim().to_string()
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> HttpResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// HTTP client abstraction.
///
/// Orchestrators are written against this trait so they can run against a
/// real server or an in-memory fake. Implementations must not retry.
pub trait HttpClient {
    /// Sends a request and returns the response, whatever its status.
    fn send(&self, request: HttpRequest) -> HttpResult<HttpResponse>;

    /// Sends a GET request.
    fn get(&self, url: &str) -> HttpResult<HttpResponse> {
        self.send(HttpRequest::get(url))
    }
}

impl<T: HttpClient + ?Sized> HttpClient for &T {
    fn send(&self, request: HttpRequest) -> HttpResult<HttpResponse> {
        (**self).send(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct RecordingClient {
        requests: RefCell<Vec<HttpRequest>>,
    }

    impl HttpClient for RecordingClient {
        fn send(&self, request: HttpRequest) -> HttpResult<HttpResponse> {
            self.requests.borrow_mut().push(request);
            Ok(HttpResponse::new(200, b"{\"ok\":true}".to_vec()))
        }
    }

    #[test]
    fn request_builder() {
        let request = HttpRequest::new(Method::Post, "http://localhost:5984/db/_bulk_docs")
            .with_header("Content-Type", "application/json")
            .with_body(b"{}".to_vec());

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.body.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn default_method_is_get() {
        assert_eq!(Method::default(), Method::Get);
        assert_eq!(HttpRequest::get("http://x/").method.to_string(), "GET");
    }

    #[test]
    fn response_helpers() {
        let response = HttpResponse::new(201, b"  {\"ok\":true}\n".to_vec());
        assert!(response.is_success());
        assert_eq!(response.text(), "{\"ok\":true}");

        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["ok"], true);

        assert!(!HttpResponse::new(404, Vec::new()).is_success());
        assert!(!HttpResponse::new(302, Vec::new()).is_success());
    }

    #[test]
    fn invalid_json_is_an_error() {
        let response = HttpResponse::new(200, b"not json".to_vec());
        assert!(response.json::<serde_json::Value>().is_err());
    }

    #[test]
    fn get_goes_through_send() {
        let client = RecordingClient {
            requests: RefCell::new(Vec::new()),
        };
        let response = client.get("http://localhost:5984/db/").unwrap();
        assert_eq!(response.status, 200);

        let requests = client.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Get);
        assert_eq!(requests[0].url, "http://localhost:5984/db/");
    }
}
