use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::info;

use crate::access_log::AccessLog;
use crate::config::Config;
use crate::content::ContentServer;
use crate::http::connection::Connection;
use crate::http::mime::ContentTypeTable;

/// Pause after a failed accept; errors such as EMFILE persist until a
/// handler releases its descriptor.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accepts connections and runs one handler task per connection.
///
/// At most `max_connections` handlers run at once; a connection arriving
/// while the limit is reached is closed without a response. In debug mode
/// connections are served one after another on the accept loop itself.
#[derive(Clone)]
pub struct Server {
    config: Arc<Config>,
    content: Arc<ContentServer>,
    access_log: Arc<AccessLog>,
    limiter: Arc<Semaphore>,
}

impl Server {
    pub fn new(config: Config, mime: ContentTypeTable, access_log: AccessLog) -> Self {
        let content = ContentServer::new(&config, Arc::new(mime));
        let limiter = Semaphore::new(config.max_connections);

        Self {
            config: Arc::new(config),
            content: Arc::new(content),
            access_log: Arc::new(access_log),
            limiter: Arc::new(limiter),
        }
    }

    pub async fn bind(&self) -> anyhow::Result<TcpListener> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!("Listening on {}", listener.local_addr()?);
        Ok(listener)
    }

    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        let mut handlers = JoinSet::new();

        loop {
            let (socket, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::error!("accept failed: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };
            info!("Accepted connection from {}", peer);

            // collect every handler that finished since the last accept
            while let Some(result) = handlers.try_join_next() {
                if let Err(e) = result {
                    tracing::error!("connection handler failed: {}", e);
                }
            }

            if self.config.debug {
                self.handle(socket, peer).await;
                continue;
            }

            let Ok(permit) = self.limiter.clone().try_acquire_owned() else {
                tracing::warn!(
                    max = self.config.max_connections,
                    "Too many connections, closing connection from {}",
                    peer
                );
                drop(socket);
                continue;
            };

            let server = self.clone();
            handlers.spawn(async move {
                server.handle(socket, peer).await;
                drop(permit);
            });
        }
    }

    async fn handle(&self, socket: TcpStream, peer: SocketAddr) {
        let local_addr = match socket.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                tracing::error!("Connection error from {}: {}", peer, e);
                return;
            }
        };

        let mut conn = Connection::new(
            socket,
            peer.ip().to_string(),
            local_addr,
            self.content.clone(),
            self.access_log.clone(),
        );

        let result = match self.config.timeout {
            Some(limit) => match timeout(limit, conn.run()).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        "Connection from {} timed out after {:?}, response may be incomplete",
                        peer,
                        limit
                    );
                    Ok(())
                }
            },
            None => conn.run().await,
        };

        if let Err(e) = result {
            tracing::error!("Connection error from {}: {}", peer, e);
        }
    }
}
