use chrono::{DateTime, Utc};

use crate::http::date::DateFormat;
use crate::http::parser::SUPPORTED_VERSION;

/// HTTP request methods.
///
/// GET and HEAD are served. POST is recognized so it can be answered with
/// 501 Not Implemented; every other token is rejected the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// POST - Recognized, never served
    POST,
}

impl Method {
    /// Parses an HTTP method token.
    ///
    /// # Example
    ///
    /// ```
    /// # use sws::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "HEAD" => Some(Method::HEAD),
            "POST" => Some(Method::POST),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
        }
    }

    /// Whether a response to this method carries a body.
    pub fn wants_body(&self) -> bool {
        *self == Method::GET
    }
}

/// A parsed `If-Modified-Since` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfModifiedSince {
    /// Header value as sent, trimmed
    pub raw: String,
    /// Parsed instant, UTC
    pub time: DateTime<Utc>,
    /// Grammar the value matched
    pub format: DateFormat,
}

/// Represents a request read from a client connection.
///
/// Built by the parser from the request line and headers; read-only once the
/// header block has been consumed.
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method
    pub method: Method,
    /// True for HTTP/0.9 requests (`GET /path` with no version)
    pub simple: bool,
    /// Version token, absent for simple requests
    pub version: Option<String>,
    /// Request path as received, without the query string
    pub path: String,
    /// Text after `?` in the request target
    pub query: Option<String>,
    /// The request line, for the access log
    pub request_line: String,
    /// Conditional-fetch header, if present and well-formed
    pub if_modified_since: Option<IfModifiedSince>,
    /// Peer address of the connection
    pub client_ip: String,
}

/// Builder for constructing Request objects.
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    version: Option<String>,
    query: Option<String>,
    if_modified_since: Option<IfModifiedSince>,
    client_ip: String,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            path: None,
            version: Some(SUPPORTED_VERSION.to_string()),
            query: None,
            if_modified_since: None,
            client_ip: "127.0.0.1".to_string(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Marks the request as HTTP/0.9.
    pub fn simple(mut self) -> Self {
        self.version = None;
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn if_modified_since(mut self, since: IfModifiedSince) -> Self {
        self.if_modified_since = Some(since);
        self
    }

    pub fn client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = ip.into();
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        let method = self.method.ok_or("method missing")?;
        let path = self.path.ok_or("path missing")?;
        let request_line = match &self.version {
            Some(version) => format!("{} {} {}", method.as_str(), path, version),
            None => format!("{} {}", method.as_str(), path),
        };

        Ok(Request {
            method,
            simple: self.version.is_none(),
            version: self.version,
            path,
            query: self.query,
            request_line,
            if_modified_since: self.if_modified_since,
            client_ip: self.client_ip,
        })
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    /// Whether the response should carry a body.
    pub fn wants_body(&self) -> bool {
        self.method.wants_body()
    }

    /// The `If-Modified-Since` instant, if one was sent and parsed.
    pub fn modified_since(&self) -> Option<DateTime<Utc>> {
        self.if_modified_since.as_ref().map(|since| since.time)
    }
}
