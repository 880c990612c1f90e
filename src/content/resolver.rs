//! Request path to filesystem path mapping.
//!
//! A request path is walked segment by segment. Named segments go one level
//! down, `..` goes one level up, `.` and empty segments (repeated slashes) are
//! ignored. Climbing above the namespace root at any point is a sandbox
//! violation, even if later segments would come back down.
//!
//! Paths starting with `/~user` live in a per-user namespace rooted at
//! `<home base>/<user>/sws` instead of the server root.
//!
//! Percent-escapes are decoded before the walk, so an encoded `..` (`%2e%2e`)
//! or `/` (`%2f`) is subject to the same depth check as a literal one.

use percent_encoding::percent_decode_str;
use std::fmt;
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::http::response::StatusCode;

/// Directory under a user's home that is served for `/~user` paths.
pub const USER_WEB_DIR: &str = "sws";

#[derive(Debug)]
pub enum ResolveError {
    SandboxViolation,
    /// Percent-escapes that do not decode to UTF-8, or that decode to NUL
    InvalidEncoding,
    NotFound,
    PermissionDenied,
    Io(std::io::Error),
}

impl ResolveError {
    pub fn status(&self) -> StatusCode {
        match self {
            ResolveError::SandboxViolation | ResolveError::PermissionDenied => StatusCode::Forbidden,
            ResolveError::NotFound => StatusCode::NotFound,
            ResolveError::InvalidEncoding => StatusCode::BadRequest,
            ResolveError::Io(_) => StatusCode::InternalServerError,
        }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::SandboxViolation => write!(f, "path escapes the served root"),
            ResolveError::NotFound => write!(f, "no such file or directory"),
            ResolveError::InvalidEncoding => write!(f, "malformed percent-encoding"),
            ResolveError::PermissionDenied => write!(f, "permission denied"),
            ResolveError::Io(e) => write!(f, "stat failed: {}", e),
        }
    }
}

impl std::error::Error for ResolveError {}

impl From<std::io::Error> for ResolveError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            ErrorKind::NotFound | ErrorKind::NotADirectory => ResolveError::NotFound,
            ErrorKind::PermissionDenied => ResolveError::PermissionDenied,
            _ => ResolveError::Io(e),
        }
    }
}

/// Which root a request path is relative to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Namespace {
    /// The server's document root
    Root,
    /// `/~name` paths
    User(String),
}

impl Namespace {
    /// URL prefix of the namespace, `""` or `/~name`.
    pub fn url_prefix(&self) -> String {
        match self {
            Namespace::Root => String::new(),
            Namespace::User(name) => format!("/~{}", name),
        }
    }
}

/// A request path mapped onto the filesystem, before anything is stat'ed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedPath {
    pub namespace: Namespace,
    /// Normalized segments below the namespace root
    pub segments: Vec<String>,
    /// Namespace root followed by the segments, no trailing slash
    pub path: PathBuf,
}

impl MappedPath {
    /// The normalized request path, e.g. `/~bob/docs/` or `/a/b`.
    pub fn url_path(&self, directory: bool) -> String {
        let mut url = self.namespace.url_prefix();
        for segment in &self.segments {
            url.push('/');
            url.push_str(segment);
        }
        if directory || self.segments.is_empty() {
            url.push('/');
        }
        url
    }

    pub fn is_namespace_root(&self) -> bool {
        self.segments.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A path that exists inside its namespace.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub mapped: MappedPath,
    /// Absolute path; directories end in exactly one `/`, files never do
    pub path: PathBuf,
    pub kind: EntryKind,
    pub metadata: Metadata,
}

/// Joins path components with exactly one `/` between them.
///
/// Leading and trailing slashes of the components are collapsed; the base
/// keeps its leading slash.
///
/// # Example
///
/// ```
/// # use sws::content::resolver::join_segments;
/// assert_eq!(join_segments("/srv/", &["a", "/b/"]), "/srv/a/b");
/// assert_eq!(join_segments("/", &["etc"]), "/etc");
/// ```
pub fn join_segments<S: AsRef<str>>(base: &str, segments: &[S]) -> String {
    let mut joined = base.trim_end_matches('/').to_string();

    for segment in segments {
        let segment = segment.as_ref().trim_matches('/');
        if segment.is_empty() {
            continue;
        }
        joined.push('/');
        joined.push_str(segment);
    }

    if joined.is_empty() && base.starts_with('/') {
        joined.push('/');
    }
    joined
}

/// Maps request paths into the served root or a user's web directory.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    home_base: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>, home_base: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            home_base: home_base.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Web root of a user namespace.
    pub fn user_root(&self, user: &str) -> PathBuf {
        PathBuf::from(join_segments(
            &self.home_base.to_string_lossy(),
            &[user, USER_WEB_DIR],
        ))
    }

    fn namespace_root(&self, namespace: &Namespace) -> PathBuf {
        match namespace {
            Namespace::Root => self.root.clone(),
            Namespace::User(user) => self.user_root(user),
        }
    }

    /// Normalizes `request_path` and maps it under the right root without
    /// touching the filesystem.
    pub fn map(&self, request_path: &str) -> Result<MappedPath, ResolveError> {
        let decoded = percent_decode_str(request_path)
            .decode_utf8()
            .map_err(|_| ResolveError::InvalidEncoding)?;
        if decoded.contains('\0') {
            return Err(ResolveError::InvalidEncoding);
        }

        let rest = decoded
            .strip_prefix('/')
            .ok_or(ResolveError::NotFound)?;

        let (namespace, rest) = match rest.strip_prefix('~') {
            Some(user_path) => {
                let (user, rest) = user_path.split_once('/').unwrap_or((user_path, ""));
                if user.is_empty() {
                    return Err(ResolveError::NotFound);
                }
                if user == "." || user == ".." {
                    return Err(ResolveError::SandboxViolation);
                }
                (Namespace::User(user.to_string()), rest)
            }
            None => (Namespace::Root, rest),
        };

        let mut segments: Vec<String> = Vec::new();
        for segment in rest.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    // depth would drop below the namespace root
                    if segments.pop().is_none() {
                        return Err(ResolveError::SandboxViolation);
                    }
                }
                name => segments.push(name.to_string()),
            }
        }

        let base = self.namespace_root(&namespace);
        let path = PathBuf::from(join_segments(&base.to_string_lossy(), &segments));

        Ok(MappedPath {
            namespace,
            segments,
            path,
        })
    }

    /// Maps `request_path` and stats the result.
    pub fn resolve(&self, request_path: &str) -> Result<Resolved, ResolveError> {
        let mapped = self.map(request_path)?;
        let metadata = std::fs::metadata(&mapped.path)?;

        let (kind, path) = if metadata.is_dir() {
            let mut dir = mapped.path.to_string_lossy().into_owned();
            if !dir.ends_with('/') {
                dir.push('/');
            }
            (EntryKind::Directory, PathBuf::from(dir))
        } else {
            (EntryKind::File, mapped.path.clone())
        };

        tracing::debug!(request = request_path, resolved = %path.display(), "path resolved");

        Ok(Resolved {
            mapped,
            path,
            kind,
            metadata,
        })
    }
}
