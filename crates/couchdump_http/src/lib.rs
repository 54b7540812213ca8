//! # couchdump HTTP
//!
//! Minimal blocking HTTP helper used by the dump and restore tools.
//!
//! This crate provides:
//! - The [`HttpClient`] trait that orchestrators are written against
//! - Request and response value types
//! - A `reqwest`-backed client with a fixed timeout, user agent and
//!   redirect policy
//!
//! A response with any status code is a successful round trip. Only
//! failures to obtain a response at all (connection refused, DNS, timeout,
//! too many redirects) surface as [`HttpError`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod blocking;
mod config;
mod error;
mod http;

pub use blocking::ReqwestClient;
pub use config::{HttpConfig, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT};
pub use error::{HttpError, HttpResult};
pub use http::{HttpClient, HttpRequest, HttpResponse, Method};
