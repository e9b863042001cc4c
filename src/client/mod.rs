//! # Client
//!
//! Composes the envelope and sharing protocols with the vault over an
//! abstract HTTP transport.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         REQUEST PIPELINE                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  FileClient op ──► body JSON string ──► sign_request(method, path, body)│
//! │                                              │                          │
//! │                                              ▼                          │
//! │  HttpRequest { Host, Content-Type, X-Username, X-Timestamp,            │
//! │                X-Signature, body }  ──► Transport::request              │
//! │                                              │                          │
//! │                                              ▼                          │
//! │  HttpResponse ──► status check ──► typed JSON ──► protocol step        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The body string that is signed is the body string that is sent. The
//! transport is the only `async` seam in the crate; everything it feeds is
//! synchronous.

mod api;
mod service;

pub use api::{
    BundleRequest, BundleResponse, FileListEntry, ListFilter, ListRequest, ListResponse,
    ListedFile, RegisterBody, PATH_DOWNLOAD, PATH_GET_BUNDLE, PATH_LIST, PATH_REGISTER,
    PATH_SHARE, PATH_UPLOAD,
};
pub use service::FileClient;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

// ============================================================================
// HTTP TYPES
// ============================================================================

/// Request method
///
/// Every endpoint of the service takes a JSON body over `POST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `POST`
    Post,
}

impl Method {
    /// Upper-case method name, as signed and sent
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Post => "POST",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outgoing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Method
    pub method: Method,
    /// Absolute path, e.g. `/api/fs/upload`
    pub path: String,
    /// Header `(name, value)` pairs in send order
    pub headers: Vec<(String, String)>,
    /// Body, sent verbatim
    pub body: String,
    /// Limit on establishing the connection
    pub connect_timeout: Duration,
    /// Limit on waiting for the response once connected
    pub read_timeout: Duration,
}

impl HttpRequest {
    /// First header named `name` (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A received response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Header `(name, value)` pairs
    pub headers: Vec<(String, String)>,
    /// Body text
    pub body: String,
}

impl HttpResponse {
    /// Response with no headers
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header named `name` (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

// ============================================================================
// TRANSPORT
// ============================================================================

/// Sends one request and returns the server's response
///
/// Implementations own connection handling (TCP/TLS, retries) and must
/// honor both timeouts carried by the request. A response with any status
/// is `Ok`; only failing to obtain a response is an error, reported as
/// [`crate::Error::TransportError`] or [`crate::Error::Timeout`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse> {
        (**self).request(request).await
    }
}
