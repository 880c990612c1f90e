use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::ffi::OsString;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::content::resolver::{MappedPath, Namespace, Resolved};
use crate::content::{Outcome, ServeError};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::{ResponseWriter, SERVER_SOFTWARE};

/// Bytes escaped inside one path segment of a link.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Link target for a mapped path; the inverse of the decoding done when the
/// path is requested.
pub fn href_path(mapped: &MappedPath, directory: bool) -> String {
    let mut href = match &mapped.namespace {
        Namespace::Root => String::new(),
        Namespace::User(name) => format!("/~{}", encode_segment(name)),
    };
    for segment in &mapped.segments {
        href.push('/');
        href.push_str(&encode_segment(segment));
    }
    if directory || mapped.segments.is_empty() {
        href.push('/');
    }
    href
}

/// One line of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub name: String,
    pub is_dir: bool,
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Reads a directory, sorted by raw file name bytes.
pub fn list_dir(dir: &Path) -> std::io::Result<Vec<IndexEntry>> {
    let mut names: Vec<OsString> = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|entry| entry.file_name()))
        .collect::<Result<_, _>>()?;
    names.sort();

    Ok(names
        .into_iter()
        .map(|name| {
            // follow symlinks; a dangling one is listed as a file
            let is_dir = std::fs::metadata(dir.join(&name))
                .map(|meta| meta.is_dir())
                .unwrap_or(false);
            IndexEntry {
                name: name.to_string_lossy().into_owned(),
                is_dir,
            }
        })
        .collect())
}

/// Renders the listing page for a resolved directory.
///
/// Links are absolute, percent-encoded request paths inside the directory's
/// namespace. No parent link is emitted at the namespace root.
pub fn render_index(resolved: &Resolved, entries: &[IndexEntry]) -> String {
    let here = resolved.mapped.url_path(true);
    let here_href = href_path(&resolved.mapped, true);

    let mut html = format!("<html><body><h1>Index of {}</h1><br />\n", escape_html(&here));

    if !resolved.mapped.is_namespace_root() {
        let mut parent = resolved.mapped.clone();
        parent.segments.pop();
        html.push_str(&format!(
            "<a href=\"{}\">Parent Directory/</a><br />\n",
            escape_html(&href_path(&parent, true))
        ));
    }

    for entry in entries {
        let suffix = if entry.is_dir { "/" } else { "" };
        html.push_str(&format!(
            "<a href=\"{}{}{}\">{}{}</a><br />\n",
            escape_html(&here_href),
            escape_html(&encode_segment(&entry.name)),
            suffix,
            escape_html(&entry.name),
            suffix
        ));
    }

    html.push_str(&format!("<p><i>{}</i></p></body></html>\n", SERVER_SOFTWARE));
    html
}

/// Builds the listing for `resolved` as HTML.
pub fn create_index(resolved: &Resolved) -> std::io::Result<String> {
    let entries = list_dir(&resolved.path)?;
    Ok(render_index(resolved, &entries))
}

pub async fn serve_index<W>(
    resolved: &Resolved,
    request: &Request,
    stream: &mut W,
) -> Result<Outcome, ServeError>
where
    W: AsyncWrite + Unpin,
{
    let html = create_index(resolved).map_err(ServeError::from_io)?;
    let response = Response::ok("text/html", html.len() as u64);

    ResponseWriter::head(&response, request.simple)
        .write_to_stream(stream)
        .await
        .map_err(ServeError::Stream)?;

    if request.wants_body() {
        stream
            .write_all(html.as_bytes())
            .await
            .map_err(|e| ServeError::Stream(e.into()))?;
        stream.flush().await.map_err(|e| ServeError::Stream(e.into()))?;
    }

    Ok(Outcome {
        status: response.status,
        content_length: response.content_length,
    })
}
