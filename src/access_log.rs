//! Per-request access log.
//!
//! One line per answered request:
//! `<client ip> <date> "<request line>" <status> <content length>`.
//! The file is opened in append mode and each line goes out in a single
//! write, so concurrent handlers never interleave partial lines.

use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::http::date::format_http_date;
use crate::http::response::StatusCode;

/// File name used when the log path is a directory.
pub const DEFAULT_LOG_NAME: &str = "sws.log";

#[derive(Debug, Default)]
pub struct AccessLog {
    file: Option<Mutex<File>>,
}

pub fn format_entry(
    client_ip: &str,
    request_line: Option<&str>,
    status: StatusCode,
    content_length: u64,
) -> String {
    format!(
        "{} {} \"{}\" {} {}\n",
        if client_ip.is_empty() { "-" } else { client_ip },
        format_http_date(Utc::now()),
        request_line.unwrap_or("-"),
        status.as_u16(),
        content_length
    )
}

impl AccessLog {
    /// Logs through `tracing` only.
    pub fn disabled() -> Self {
        Self { file: None }
    }

    pub fn open(path: &Path) -> std::io::Result<Self> {
        let path: PathBuf = if path.is_dir() {
            path.join(DEFAULT_LOG_NAME)
        } else {
            path.to_path_buf()
        };

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            file: Some(Mutex::new(file)),
        })
    }

    pub fn record(
        &self,
        client_ip: &str,
        request_line: Option<&str>,
        status: StatusCode,
        content_length: u64,
    ) {
        tracing::info!(
            client = client_ip,
            request = request_line.unwrap_or("-"),
            status = status.as_u16(),
            length = content_length,
            "request served"
        );

        let Some(file) = &self.file else {
            return;
        };

        let entry = format_entry(client_ip, request_line, status, content_length);
        let mut file = match file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = file.write_all(entry.as_bytes()) {
            tracing::error!(error = %e, "failed to write access log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_layout() {
        let entry = format_entry("10.0.0.1", Some("GET / HTTP/1.1"), StatusCode::Ok, 42);
        assert!(entry.starts_with("10.0.0.1 "));
        assert!(entry.ends_with(" GMT \"GET / HTTP/1.1\" 200 42\n"));

        let entry = format_entry("", None, StatusCode::BadRequest, 0);
        assert!(entry.starts_with("- "));
        assert!(entry.contains("\"-\" 400 0"));
    }
}
