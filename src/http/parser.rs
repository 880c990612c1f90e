use bytes::BytesMut;
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::date::parse_http_date;
use crate::http::request::{IfModifiedSince, Method, Request};
use crate::http::response::StatusCode;

/// Longest line accepted from a client, terminator excluded.
pub const MAX_LINE_LEN: usize = 8096;

/// The only version token accepted on a full request line. No negotiation
/// happens; any other token, `HTTP/1.0` included, is a bad request.
pub const SUPPORTED_VERSION: &str = "HTTP/1.1";

#[derive(Debug)]
pub enum ParseError {
    /// Peer went away in the middle of the request
    ConnectionClosed,
    BareCarriageReturn,
    BareLineFeed,
    LineTooLong,
    InvalidRequestLine,
    UnsupportedVersion,
    NotImplemented,
    InvalidHeader,
    Io(std::io::Error),
}

impl ParseError {
    /// Status to answer with, or `None` when the connection should just be
    /// dropped.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ParseError::ConnectionClosed => None,
            ParseError::BareCarriageReturn
            | ParseError::BareLineFeed
            | ParseError::LineTooLong
            | ParseError::InvalidRequestLine
            | ParseError::UnsupportedVersion
            | ParseError::InvalidHeader => Some(StatusCode::BadRequest),
            ParseError::NotImplemented => Some(StatusCode::NotImplemented),
            ParseError::Io(_) => Some(StatusCode::InternalServerError),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::ConnectionClosed => write!(f, "connection closed by client"),
            ParseError::BareCarriageReturn => write!(f, "CR not followed by LF"),
            ParseError::BareLineFeed => write!(f, "LF without preceding CR"),
            ParseError::LineTooLong => write!(f, "line exceeds {} bytes", MAX_LINE_LEN),
            ParseError::InvalidRequestLine => write!(f, "malformed request line"),
            ParseError::UnsupportedVersion => write!(f, "unsupported protocol version"),
            ParseError::NotImplemented => write!(f, "method not implemented"),
            ParseError::InvalidHeader => write!(f, "malformed header line"),
            ParseError::Io(e) => write!(f, "read error: {}", e),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        ParseError::Io(e)
    }
}

/// How a line terminator is recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    /// CRLF only; a lone CR or a lone LF is a protocol error
    Strict,
    /// LF ends a line and a CR right before it is dropped (CGI output)
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    Normal,
    SawCr,
    Done,
}

/// Reads a stream one byte at a time, never buffering more than the current
/// line plus a single peeked byte.
pub struct LineReader<R> {
    inner: R,
    peeked: Option<u8>,
    ending: LineEnding,
}

impl<R> LineReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            peeked: None,
            ending: LineEnding::Strict,
        }
    }

    pub fn lenient(inner: R) -> Self {
        Self {
            inner,
            peeked: None,
            ending: LineEnding::Lenient,
        }
    }

    async fn next_byte(&mut self) -> std::io::Result<Option<u8>> {
        if let Some(byte) = self.peeked.take() {
            return Ok(Some(byte));
        }

        let mut byte = [0u8; 1];
        let n = self.inner.read(&mut byte).await?;
        Ok((n == 1).then_some(byte[0]))
    }

    async fn peek_byte(&mut self) -> std::io::Result<Option<u8>> {
        if self.peeked.is_none() {
            self.peeked = self.next_byte().await?;
        }
        Ok(self.peeked)
    }

    /// Reads one line without its terminator.
    ///
    /// Returns `Ok(None)` if the stream ends before the first byte of the
    /// line. An empty line comes back as an empty vector.
    pub async fn read_line(&mut self) -> Result<Option<Vec<u8>>, ParseError> {
        let strict = self.ending == LineEnding::Strict;
        let mut line = Vec::new();
        let mut state = LineState::Normal;

        loop {
            match state {
                LineState::Normal => {
                    let Some(byte) = self.next_byte().await? else {
                        if line.is_empty() {
                            return Ok(None);
                        }
                        if strict {
                            return Err(ParseError::ConnectionClosed);
                        }
                        return Ok(Some(line));
                    };

                    match byte {
                        b'\r' => state = LineState::SawCr,
                        b'\n' if strict => return Err(ParseError::BareLineFeed),
                        b'\n' => state = LineState::Done,
                        _ => {
                            if line.len() >= MAX_LINE_LEN {
                                return Err(ParseError::LineTooLong);
                            }
                            line.push(byte);
                        }
                    }
                }

                LineState::SawCr => match self.peek_byte().await? {
                    Some(b'\n') => {
                        self.peeked = None;
                        state = LineState::Done;
                    }
                    _ if strict => return Err(ParseError::BareCarriageReturn),
                    _ => {
                        line.push(b'\r');
                        state = LineState::Normal;
                    }
                },

                LineState::Done => return Ok(Some(line)),
            }
        }
    }

    /// Drains everything left in the stream, including a peeked byte.
    pub async fn read_to_end(&mut self, buf: &mut BytesMut) -> std::io::Result<usize> {
        let mut total = 0;

        if let Some(byte) = self.peeked.take() {
            buf.extend_from_slice(&[byte]);
            total += 1;
        }

        loop {
            buf.reserve(8192);
            let n = self.inner.read_buf(buf).await?;
            if n == 0 {
                return Ok(total);
            }
            total += n;
        }
    }
}

/// Parses `METHOD SP PATH SP VERSION` or the HTTP/0.9 form `GET SP PATH`.
///
/// The returned request has no client address; the connection fills it in.
pub fn parse_request_line(line: &[u8]) -> Result<Request, ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidRequestLine)?;
    let parts: Vec<&str> = line.split(' ').filter(|part| !part.is_empty()).collect();

    let method_str = parts.first().ok_or(ParseError::InvalidRequestLine)?;
    let method = match Method::from_str(method_str) {
        Some(Method::POST) | None => return Err(ParseError::NotImplemented),
        Some(method) => method,
    };

    let target = parts.get(1).ok_or(ParseError::InvalidRequestLine)?;
    if !target.starts_with('/') {
        return Err(ParseError::InvalidRequestLine);
    }

    let version = match parts.len() {
        2 if method == Method::GET => None,
        3 => {
            if parts[2] != SUPPORTED_VERSION {
                return Err(ParseError::UnsupportedVersion);
            }
            Some(parts[2].to_string())
        }
        _ => return Err(ParseError::InvalidRequestLine),
    };

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (target.to_string(), None),
    };

    Ok(Request {
        method,
        simple: version.is_none(),
        version,
        path,
        query,
        request_line: line.to_string(),
        if_modified_since: None,
        client_ip: String::new(),
    })
}

/// Parses one header line into `request`.
///
/// Only `If-Modified-Since` is interpreted. A date in none of the accepted
/// grammars leaves the request without a condition.
pub fn parse_header_line(line: &[u8], request: &mut Request) -> Result<(), ParseError> {
    let line = String::from_utf8_lossy(line);
    let (key, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;

    if key.trim().eq_ignore_ascii_case("If-Modified-Since") {
        let raw = value.trim();
        request.if_modified_since = parse_http_date(raw).map(|(time, format)| IfModifiedSince {
            raw: raw.to_string(),
            time,
            format,
        });
    }

    Ok(())
}

/// Reads a full request (request line, then headers up to the empty line).
///
/// Returns `Ok(None)` when the client closes the connection without sending
/// anything.
pub async fn read_request<R>(reader: &mut LineReader<R>) -> Result<Option<Request>, ParseError>
where
    R: AsyncRead + Unpin,
{
    let Some(line) = reader.read_line().await? else {
        return Ok(None);
    };

    let mut request = parse_request_line(&line)?;
    if request.simple {
        return Ok(Some(request));
    }

    loop {
        let line = reader
            .read_line()
            .await?
            .ok_or(ParseError::ConnectionClosed)?;

        if line.is_empty() {
            return Ok(Some(request));
        }

        parse_header_line(&line, &mut request)?;
    }
}
