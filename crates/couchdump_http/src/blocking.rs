//! `reqwest`-backed blocking client.

use crate::config::HttpConfig;
use crate::error::{HttpError, HttpResult};
use crate::http::{HttpClient, HttpRequest, HttpResponse, Method};
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use tracing::debug;

/// Blocking HTTP client applying an [`HttpConfig`] to every request.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Builds a client from the given policy.
    pub fn new(config: HttpConfig) -> HttpResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .redirect(Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;

        Ok(Self { client })
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
        Method::Post => reqwest::Method::POST,
    }
}

fn classify(url: &str, err: reqwest::Error) -> HttpError {
    if err.is_timeout() {
        HttpError::Timeout { url: url.into() }
    } else if err.is_redirect() {
        HttpError::TooManyRedirects { url: url.into() }
    } else {
        HttpError::transport(url, err.to_string())
    }
}

impl HttpClient for ReqwestClient {
    fn send(&self, request: HttpRequest) -> HttpResult<HttpResponse> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        debug!(%method, %url, "sending request");

        let mut builder = self.client.request(to_reqwest(method), &url);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().map_err(|e| classify(&url, e))?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| classify(&url, e))?;

        debug!(%method, %url, status, bytes = body.len(), "received response");

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    /// Accepts one connection, returns the canned response and hands back
    /// the raw request head.
    fn serve_once(response: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let mut head = Vec::new();
            loop {
                let n = stream.read(&mut buf).unwrap();
                head.extend_from_slice(&buf[..n]);
                if n == 0 || head.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&head).to_string()
        });
        (format!("http://{addr}/db/"), handle)
    }

    #[test]
    fn error_status_is_a_response() {
        let (url, server) = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnot found",
        );
        let client = ReqwestClient::new(HttpConfig::new().with_user_agent("test-agent")).unwrap();

        let response = client.get(&url).unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.text(), "not found");

        let head = server.join().unwrap().to_ascii_lowercase();
        assert!(head.starts_with("get /db/ "));
        assert!(head.contains("user-agent: test-agent"));
    }

    #[test]
    fn connection_refused_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ReqwestClient::new(HttpConfig::default()).unwrap();
        let err = client.get(&format!("http://{addr}/db/")).unwrap_err();
        assert!(matches!(err, HttpError::Transport { .. }));
    }

    #[test]
    fn slow_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(800));
            drop(stream);
        });

        let client =
            ReqwestClient::new(HttpConfig::new().with_timeout(Duration::from_millis(200))).unwrap();
        let err = client.get(&format!("http://{addr}/db/")).unwrap_err();
        assert!(matches!(err, HttpError::Timeout { .. }));

        server.join().unwrap();
    }
}
