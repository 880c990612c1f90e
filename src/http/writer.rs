use chrono::Utc;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::date::format_http_date;
use crate::http::response::{Response, StatusCode, error_page};

pub const HTTP_VERSION: &str = "HTTP/1.0";
pub const SERVER_SOFTWARE: &str = concat!("sws/", env!("CARGO_PKG_VERSION"));

/// Serializes the status line and header block.
///
/// 304 responses carry no `Content-Length`; every other status does.
pub fn serialize_head(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::new();

    let status_line = format!("{} {}\r\n", HTTP_VERSION, resp.status.status_text());
    buf.extend_from_slice(status_line.as_bytes());

    let mut header = |key: &str, value: &str| {
        buf.extend_from_slice(key.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(b"\r\n");
    };

    header("Date", &format_http_date(Utc::now()));
    header("Server", SERVER_SOFTWARE);
    if let Some(last_modified) = resp.last_modified {
        header("Last-Modified", &format_http_date(last_modified));
    }
    header("Content-Type", &resp.content_type);
    if resp.status != StatusCode::NotModified {
        header("Content-Length", &resp.content_length.to_string());
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

/// Writes a response head, and for error statuses the inline error page, to
/// the client.
///
/// Simple (HTTP/0.9) clients never see a status line or headers.
pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl ResponseWriter {
    /// Prepares the head of `response` only; the caller streams the body.
    pub fn head(response: &Response, simple: bool) -> Self {
        let buffer = if simple {
            Vec::new()
        } else {
            serialize_head(response)
        };

        Self { buffer, written: 0 }
    }

    /// A complete error response. The inline page is left out when
    /// `with_body` is false (HEAD requests).
    pub fn error(status: StatusCode, simple: bool, with_body: bool) -> Self {
        let mut writer = Self::head(&Response::error(status), simple);
        if with_body {
            writer.buffer.extend_from_slice(error_page(status).as_bytes());
        }
        writer
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        stream.flush().await?;
        Ok(())
    }
}
