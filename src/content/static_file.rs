use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::content::{Outcome, ServeError};
use crate::http::date::from_system_time;
use crate::http::mime::ContentTypeTable;
use crate::http::request::Request;
use crate::http::response::{ResponseBuilder, StatusCode};
use crate::http::writer::ResponseWriter;

/// Sends a regular file, honouring `If-Modified-Since`.
///
/// The body is streamed for GET only and never with a 304.
pub async fn serve_file<W>(
    path: &Path,
    request: &Request,
    mime: &ContentTypeTable,
    stream: &mut W,
) -> Result<Outcome, ServeError>
where
    W: AsyncWrite + Unpin,
{
    let file = File::open(path).await.map_err(ServeError::from_io)?;
    let metadata = file.metadata().await.map_err(ServeError::from_io)?;
    let last_modified = metadata.modified().ok().map(from_system_time);

    let status = match (request.modified_since(), last_modified) {
        (Some(since), Some(modified)) if modified <= since => StatusCode::NotModified,
        _ => StatusCode::Ok,
    };

    let mut builder = ResponseBuilder::new(status)
        .content_type(mime.for_path(path))
        .content_length(metadata.len());
    if let Some(modified) = last_modified {
        builder = builder.last_modified(modified);
    }
    let response = builder.build();

    ResponseWriter::head(&response, request.simple)
        .write_to_stream(stream)
        .await
        .map_err(ServeError::Stream)?;

    if status == StatusCode::Ok && request.wants_body() {
        let mut body = file.take(metadata.len());
        tokio::io::copy(&mut body, stream)
            .await
            .map_err(|e| ServeError::Stream(e.into()))?;
        stream.flush().await.map_err(|e| ServeError::Stream(e.into()))?;
    }

    tracing::debug!(path = %path.display(), status = status.as_u16(), "file served");

    Ok(Outcome {
        status,
        content_length: if status == StatusCode::Ok { metadata.len() } else { 0 },
    })
}
