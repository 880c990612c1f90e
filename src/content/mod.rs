//! Response bodies.
//!
//! A request path is resolved inside the sandbox and then answered by one of
//! three strategies: a static file, a generated directory index, or the output
//! of a CGI program.

pub mod cgi;
pub mod index;
pub mod resolver;
pub mod static_file;

pub use resolver::{EntryKind, PathResolver, ResolveError, Resolved};

use std::fmt;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWrite;

use crate::config::Config;
use crate::content::cgi::CgiContext;
use crate::content::resolver::Namespace;
use crate::http::mime::ContentTypeTable;
use crate::http::request::Request;
use crate::http::response::StatusCode;

/// Served in place of a listing when a directory contains it.
pub const INDEX_FILE: &str = "index.html";

/// What was sent, for the access log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub status: StatusCode,
    pub content_length: u64,
}

#[derive(Debug)]
pub enum ServeError {
    /// Nothing was written yet; answer with this status
    Status(StatusCode, String),
    /// Failure after the head went out; the connection can only be closed
    Stream(anyhow::Error),
}

impl ServeError {
    /// Classifies an IO failure that happened before any output.
    pub fn from_io(e: std::io::Error) -> Self {
        let status = match e.kind() {
            ErrorKind::NotFound | ErrorKind::NotADirectory => StatusCode::NotFound,
            ErrorKind::PermissionDenied => StatusCode::Forbidden,
            _ => StatusCode::InternalServerError,
        };
        ServeError::Status(status, e.to_string())
    }
}

impl From<ResolveError> for ServeError {
    fn from(e: ResolveError) -> Self {
        ServeError::Status(e.status(), e.to_string())
    }
}

impl fmt::Display for ServeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServeError::Status(status, reason) => write!(f, "{}: {}", status.status_text(), reason),
            ServeError::Stream(e) => write!(f, "write failed: {}", e),
        }
    }
}

impl std::error::Error for ServeError {}

/// Picks and runs the body strategy for each request.
#[derive(Debug, Clone)]
pub struct ContentServer {
    resolver: PathResolver,
    cgi_dir: Option<PathBuf>,
    mime: Arc<ContentTypeTable>,
    server_name: Option<String>,
}

impl ContentServer {
    pub fn new(config: &Config, mime: Arc<ContentTypeTable>) -> Self {
        Self {
            resolver: PathResolver::new(&config.root_dir, &config.home_base),
            cgi_dir: config.cgi_dir.clone(),
            mime,
            server_name: config.server_name.clone(),
        }
    }

    /// Whether `resolved` names a program under the CGI directory.
    pub fn is_cgi(&self, resolved: &Resolved) -> bool {
        let Some(cgi_dir) = &self.cgi_dir else {
            return false;
        };

        resolved.kind == EntryKind::File
            && resolved.mapped.namespace == Namespace::Root
            && resolved.path.starts_with(cgi_dir)
    }

    fn cgi_context(&self, resolved: &Resolved, local_addr: SocketAddr) -> CgiContext {
        CgiContext {
            server_name: self
                .server_name
                .clone()
                .unwrap_or_else(|| local_addr.ip().to_string()),
            server_port: local_addr.port(),
            script_name: resolved.mapped.url_path(false),
        }
    }

    fn index_file(dir: &Path) -> Option<PathBuf> {
        let index = dir.join(INDEX_FILE);
        std::fs::metadata(&index)
            .map(|meta| meta.is_file())
            .unwrap_or(false)
            .then_some(index)
    }

    /// Resolves the request path and writes a complete response.
    ///
    /// `ServeError::Status` means nothing has been written yet.
    pub async fn respond<W>(
        &self,
        request: &Request,
        local_addr: SocketAddr,
        stream: &mut W,
    ) -> Result<Outcome, ServeError>
    where
        W: AsyncWrite + Unpin,
    {
        let resolved = self.resolver.resolve(&request.path)?;

        match resolved.kind {
            EntryKind::Directory => match Self::index_file(&resolved.path) {
                Some(index) => {
                    static_file::serve_file(&index, request, &self.mime, stream).await
                }
                None => index::serve_index(&resolved, request, stream).await,
            },
            EntryKind::File if self.is_cgi(&resolved) => {
                let context = self.cgi_context(&resolved, local_addr);
                cgi::execute_cgi(&resolved.path, request, &context, stream).await
            }
            EntryKind::File => {
                static_file::serve_file(&resolved.path, request, &self.mime, stream).await
            }
        }
    }
}
