//! CGI execution.
//!
//! The program runs as a separate process with its standard output piped
//! back. Its header block is read line by line up to the first empty line,
//! the rest of its output is collected as the body, and the child is always
//! reaped before a response goes out.

use bytes::BytesMut;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};

use crate::content::{Outcome, ServeError};
use crate::http::parser::LineReader;
use crate::http::request::Request;
use crate::http::response::{ResponseBuilder, StatusCode};
use crate::http::writer::{ResponseWriter, SERVER_SOFTWARE};

pub const GATEWAY_INTERFACE: &str = "CGI/1.1";
const DEFAULT_CGI_CONTENT_TYPE: &str = "text/html";
const SPAWN_ATTEMPTS: u32 = 3;

/// Values describing the server side of the connection.
#[derive(Debug, Clone)]
pub struct CgiContext {
    pub server_name: String,
    pub server_port: u16,
    /// Request path of the script, for `SCRIPT_NAME`
    pub script_name: String,
}

/// Headers a CGI program may set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CgiHeaders {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub status: Option<StatusCode>,
}

impl CgiHeaders {
    /// Interprets one header line. Unknown headers are ignored.
    pub fn parse_line(&mut self, line: &str) -> Result<(), ServeError> {
        let (name, value) = line.split_once(':').ok_or_else(|| {
            ServeError::Status(
                StatusCode::InternalServerError,
                format!("malformed CGI header line {:?}", line),
            )
        })?;
        let name = name.trim();
        let value = value.trim();

        if name.eq_ignore_ascii_case("Content-Type") {
            self.content_type = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("Content-Length") {
            self.content_length = value.parse().ok();
        } else if name.eq_ignore_ascii_case("Status") {
            self.status = value
                .split_whitespace()
                .next()
                .and_then(|code| code.parse().ok())
                .and_then(StatusCode::from_u16);
        }

        Ok(())
    }
}

/// Environment handed to the program.
pub fn cgi_environment(request: &Request, context: &CgiContext) -> Vec<(String, String)> {
    let mut env = vec![
        ("SERVER_SOFTWARE".to_string(), SERVER_SOFTWARE.to_string()),
        ("SERVER_NAME".to_string(), context.server_name.clone()),
        ("SERVER_PORT".to_string(), context.server_port.to_string()),
        ("SERVER_PROTOCOL".to_string(), request.version.clone().unwrap_or_else(|| "HTTP/0.9".to_string())),
        ("GATEWAY_INTERFACE".to_string(), GATEWAY_INTERFACE.to_string()),
        ("REMOTE_ADDR".to_string(), request.client_ip.clone()),
        ("REQUEST_METHOD".to_string(), request.method.as_str().to_string()),
        ("SCRIPT_NAME".to_string(), context.script_name.clone()),
        ("QUERY_STRING".to_string(), request.query.clone().unwrap_or_default()),
    ];

    if let Some(since) = &request.if_modified_since {
        env.push(("HTTP_IF_MOD_SINCE".to_string(), since.raw.clone()));
    }
    if let Some(path) = std::env::var_os("PATH") {
        env.push(("PATH".to_string(), path.to_string_lossy().into_owned()));
    }

    env
}

async fn spawn(command: &mut Command) -> std::io::Result<Child> {
    let mut attempt = 1;
    loop {
        match command.spawn() {
            // the script may still be open for writing in another process
            Err(e) if e.kind() == ErrorKind::ExecutableFileBusy && attempt < SPAWN_ATTEMPTS => {
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            result => return result,
        }
    }
}

/// Reads the header block, then everything after it.
pub async fn read_cgi_output<R>(output: R) -> Result<(CgiHeaders, BytesMut), ServeError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = LineReader::lenient(output);
    let mut headers = CgiHeaders::default();

    loop {
        let line = reader.read_line().await.map_err(|e| {
            ServeError::Status(StatusCode::InternalServerError, format!("reading CGI headers: {}", e))
        })?;

        match line {
            // output ended inside the header block
            None => break,
            Some(line) if line.is_empty() => break,
            Some(line) => headers.parse_line(&String::from_utf8_lossy(&line))?,
        }
    }

    let mut body = BytesMut::new();
    reader
        .read_to_end(&mut body)
        .await
        .map_err(ServeError::from_io)?;

    Ok((headers, body))
}

/// The part of the program's output that is sent as the body. A declared
/// `Content-Length` cuts the output short but never pads it, so the length in
/// the head always matches the bytes that follow.
pub fn framed_body(body: &[u8], declared: Option<u64>) -> &[u8] {
    match declared {
        Some(declared) if declared < body.len() as u64 => &body[..declared as usize],
        _ => body,
    }
}

/// Runs the program at `path` and relays its output.
pub async fn execute_cgi<W>(
    path: &Path,
    request: &Request,
    context: &CgiContext,
    stream: &mut W,
) -> Result<Outcome, ServeError>
where
    W: AsyncWrite + Unpin,
{
    let mut command = Command::new(path);
    command
        .env_clear()
        .envs(cgi_environment(request, context))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);
    if let Some(dir) = path.parent() {
        command.current_dir(dir);
    }

    let mut child = spawn(&mut command).await.map_err(|e| {
        tracing::error!(script = %path.display(), error = %e, "failed to start CGI program");
        ServeError::from_io(e)
    })?;
    tracing::debug!(script = %path.display(), pid = child.id(), "CGI program started");

    let output = match child.stdout.take() {
        Some(stdout) => read_cgi_output(stdout).await,
        None => Err(ServeError::Status(
            StatusCode::InternalServerError,
            "CGI stdout was not captured".to_string(),
        )),
    };
    if output.is_err() {
        let _ = child.start_kill();
    }

    let exit = child.wait().await.map_err(ServeError::from_io)?;
    let (headers, body) = output?;
    if !exit.success() {
        return Err(ServeError::Status(
            StatusCode::InternalServerError,
            format!("CGI program {} exited with {}", path.display(), exit),
        ));
    }

    let status = headers.status.unwrap_or(StatusCode::Ok);
    let body = framed_body(&body, headers.content_length);
    let content_length = body.len() as u64;
    let response = ResponseBuilder::new(status)
        .content_type(
            headers
                .content_type
                .unwrap_or_else(|| DEFAULT_CGI_CONTENT_TYPE.to_string()),
        )
        .content_length(content_length)
        .build();

    ResponseWriter::head(&response, request.simple)
        .write_to_stream(stream)
        .await
        .map_err(ServeError::Stream)?;

    if request.wants_body() && status != StatusCode::NotModified {
        stream
            .write_all(body)
            .await
            .map_err(|e| ServeError::Stream(e.into()))?;
        stream.flush().await.map_err(|e| ServeError::Stream(e.into()))?;
    }

    tracing::debug!(script = %path.display(), status = status.as_u16(), bytes = body.len(), "CGI response relayed");

    Ok(Outcome {
        status,
        content_length,
    })
}
