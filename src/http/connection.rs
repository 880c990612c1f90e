use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::access_log::AccessLog;
use crate::content::{ContentServer, Outcome, ServeError};
use crate::http::parser::{LineReader, ParseError, read_request};
use crate::http::request::Request;
use crate::http::response::{StatusCode, error_page};
use crate::http::writer::ResponseWriter;

/// One client connection, answered once and then closed.
pub struct Connection<S> {
    stream: S,
    client_ip: String,
    local_addr: SocketAddr,
    content: Arc<ContentServer>,
    access_log: Arc<AccessLog>,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Rejecting(StatusCode),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        client_ip: impl Into<String>,
        local_addr: SocketAddr,
        content: Arc<ContentServer>,
        access_log: Arc<AccessLog>,
    ) -> Self {
        Self {
            stream,
            client_ip: client_ip.into(),
            local_addr,
            content,
            access_log,
            state: ConnectionState::Reading,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    self.state = match self.read_request().await {
                        Ok(Some(request)) => ConnectionState::Processing(request),
                        Ok(None) => {
                            tracing::debug!(client = %self.client_ip, "closed without a request");
                            ConnectionState::Closed
                        }
                        Err(e) => match e.status() {
                            Some(status) => {
                                tracing::warn!(client = %self.client_ip, error = %e, "rejecting request");
                                ConnectionState::Rejecting(status)
                            }
                            None => {
                                tracing::debug!(client = %self.client_ip, error = %e, "request aborted");
                                ConnectionState::Closed
                            }
                        },
                    };
                }

                ConnectionState::Processing(request) => {
                    let outcome = self.process(&request).await?;
                    self.access_log.record(
                        &request.client_ip,
                        Some(&request.request_line),
                        outcome.status,
                        outcome.content_length,
                    );
                }

                ConnectionState::Rejecting(status) => {
                    ResponseWriter::error(status, false, true)
                        .write_to_stream(&mut self.stream)
                        .await?;
                    self.access_log
                        .record(&self.client_ip, None, status, error_page(status).len() as u64);
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    pub async fn read_request(&mut self) -> Result<Option<Request>, ParseError> {
        let mut reader = LineReader::new(&mut self.stream);
        let mut request = read_request(&mut reader).await?;

        if let Some(request) = request.as_mut() {
            request.client_ip = self.client_ip.clone();
        }
        Ok(request)
    }

    async fn process(&mut self, request: &Request) -> anyhow::Result<Outcome> {
        match self
            .content
            .respond(request, self.local_addr, &mut self.stream)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(ServeError::Status(status, reason)) => {
                if status == StatusCode::InternalServerError {
                    tracing::error!(path = %request.path, reason = %reason, "request failed");
                } else {
                    tracing::info!(path = %request.path, reason = %reason, status = status.as_u16(), "request refused");
                }

                let with_body = request.wants_body();
                ResponseWriter::error(status, request.simple, with_body)
                    .write_to_stream(&mut self.stream)
                    .await?;

                Ok(Outcome {
                    status,
                    content_length: error_page(status).len() as u64,
                })
            }
            Err(ServeError::Stream(e)) => Err(e.context(format!("sending {}", request.path))),
        }
    }
}
