//! Server network layer: TCP listener and per-connection request handling
//!
//! Every connection carries exactly one request. The handler reads one line,
//! answers with one document and closes; malformed lines are dropped without a
//! reply. Each connection runs on its own task so a slow client only holds up
//! itself.

use crate::query::BoardQuery;
use crate::upstream::LeaderboardService;
use log::{error, info, warn};
use shared::{render_error, render_fetch, render_info, Command, Request, MAX_LINE_LEN};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpListener;

/// Turns requests into response documents
pub struct Dispatcher<S> {
    query: BoardQuery<S>,
    service_host: String,
}

impl<S: LeaderboardService> Dispatcher<S> {
    pub fn new(query: BoardQuery<S>, service_host: impl Into<String>) -> Self {
        Self {
            query,
            service_host: service_host.into(),
        }
    }

    /// Serves a single client connection.
    ///
    /// Writes nothing when the client closes before sending a line or when
    /// the line is not a valid request.
    pub async fn handle_connection<T>(&self, stream: T, peer: SocketAddr) -> std::io::Result<()>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(stream);
        let mut line = Vec::new();

        // one byte past the limit so an overlong line is seen as such
        let read = (&mut reader)
            .take(MAX_LINE_LEN as u64 + 1)
            .read_until(b'\n', &mut line)
            .await?;

        if read == 0 {
            info!("client disconnected");
            return Ok(());
        }

        let request = match Request::parse(&line) {
            Ok(request) => request,
            Err(e) => {
                info!("Invalid request from {}: {}", peer, e);
                return Ok(());
            }
        };

        let response = self.respond(&request).await;

        let stream = reader.get_mut();
        stream.write_all(response.as_bytes()).await?;
        stream.shutdown().await?;
        Ok(())
    }

    /// Builds the document answering `request`
    pub async fn respond(&self, request: &Request) -> String {
        info!("Received {} for {}", request.command, request.day);

        match self.query.resolve(request.command, &request.day).await {
            Ok(resolved) => match request.command {
                Command::Info => render_info(&resolved.handle, &self.service_host),
                Command::Fetch => render_fetch(
                    resolved.app_id,
                    &resolved.handle,
                    &resolved.entries.unwrap_or_default(),
                ),
            },
            Err(e) => {
                warn!("{} {} failed: {}", request.command, request.day, e);
                render_error(e.client_message())
            }
        }
    }
}

/// Accept loop handing each connection to its own task
pub struct Server<S> {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher<S>>,
}

impl<S: LeaderboardService> Server<S> {
    pub async fn bind(addr: &str, dispatcher: Dispatcher<S>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            dispatcher: Arc::new(dispatcher),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until `shutdown` resolves.
    ///
    /// Connections already accepted finish on their own tasks.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            info!("New connection from {}", peer);
                            let dispatcher = Arc::clone(&self.dispatcher);
                            tokio::spawn(async move {
                                if let Err(e) = dispatcher.handle_connection(stream, peer).await {
                                    warn!("Connection {} failed: {}", peer, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Error accepting connection: {}", e);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    }
                }

                _ = &mut shutdown => {
                    info!("Server stopped accepting connections");
                    break;
                }
            }
        }
    }
}
