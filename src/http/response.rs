use chrono::{DateTime, Utc};

/// HTTP status codes the server can emit.
///
/// - `Ok` (200): Request successful
/// - `NotModified` (304): Conditional GET, resource unchanged
/// - `BadRequest` (400): Malformed request
/// - `Forbidden` (403): Outside the sandbox or not readable
/// - `NotFound` (404): Resource not found
/// - `InternalServerError` (500): Server error
/// - `NotImplemented` (501): Method not supported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 304 Not Modified
    NotModified,
    /// 400 Bad Request
    BadRequest,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 500 Internal Server Error
    InternalServerError,
    /// 501 Not Implemented
    NotImplemented,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use sws::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotModified.as_u16(), 304);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::NotModified => 304,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
            StatusCode::NotImplemented => 501,
        }
    }

    /// Maps a numeric code back onto the fixed set, if it is part of it.
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            200 => Some(StatusCode::Ok),
            304 => Some(StatusCode::NotModified),
            400 => Some(StatusCode::BadRequest),
            403 => Some(StatusCode::Forbidden),
            404 => Some(StatusCode::NotFound),
            500 => Some(StatusCode::InternalServerError),
            501 => Some(StatusCode::NotImplemented),
            _ => None,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use sws::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NotModified => "Not Modified",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
        }
    }

    /// The status line text after the protocol version, e.g. `404 Not Found`.
    pub fn status_text(&self) -> String {
        format!("{} {}", self.as_u16(), self.reason_phrase())
    }
}

/// Metadata describing a response about to be written.
///
/// The body itself is streamed separately by the content strategy; this record
/// only carries what goes into the header block.
#[derive(Debug, Clone)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// Length of the entity body, reported even when the body is suppressed
    pub content_length: u64,
    /// Modification time of the served resource
    pub last_modified: Option<DateTime<Utc>>,
    /// MIME type of the body
    pub content_type: String,
}

/// Builder for constructing response metadata in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .content_type("text/css")
///     .content_length(42)
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    content_length: u64,
    last_modified: Option<DateTime<Utc>>,
    content_type: String,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            content_length: 0,
            last_modified: None,
            content_type: "text/html".to_string(),
        }
    }

    pub fn content_length(mut self, length: u64) -> Self {
        self.content_length = length;
        self
    }

    pub fn last_modified(mut self, time: DateTime<Utc>) -> Self {
        self.last_modified = Some(time);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Builds the final Response.
    pub fn build(self) -> Response {
        Response {
            status: self.status,
            content_length: self.content_length,
            last_modified: self.last_modified,
            content_type: self.content_type,
        }
    }
}

/// The inline HTML page sent with error statuses.
pub fn error_page(status: StatusCode) -> String {
    format!("<html><h1>{}</h1></html>", status.status_text())
}

impl Response {
    /// Creates a 200 OK response for a body of the given type and length.
    pub fn ok(content_type: impl Into<String>, content_length: u64) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .content_type(content_type)
            .content_length(content_length)
            .build()
    }

    /// Creates an error response whose length is that of its inline page.
    pub fn error(status: StatusCode) -> Self {
        ResponseBuilder::new(status)
            .content_length(error_page(status).len() as u64)
            .build()
    }
}
