//! # Leaderboard Query Client
//!
//! Minimal client for the one-line leaderboard protocol. It opens a connection,
//! sends one request line and reads the reply until the server closes the
//! socket. An empty reply means the server dropped the request.

use log::debug;
use shared::Request;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Sends `request` to the server at `addr` and returns the raw reply.
///
/// A server that drops the request without answering yields an empty reply,
/// whether it closes cleanly or resets the connection.
pub async fn send_request(addr: &str, request: &Request) -> std::io::Result<String> {
    let mut stream = TcpStream::connect(addr).await?;
    debug!("Connected to {}", addr);

    if let Err(e) = stream.write_all(request.to_line().as_bytes()).await {
        if is_peer_reset(&e) {
            debug!("Server closed before reading the request: {}", e);
            return Ok(String::new());
        }
        return Err(e);
    }

    let mut reply = Vec::new();
    match stream.read_to_end(&mut reply).await {
        Ok(_) => {}
        Err(e) if is_peer_reset(&e) => debug!("Connection reset after {} bytes", reply.len()),
        Err(e) => return Err(e),
    }
    debug!("Received {} bytes", reply.len());

    Ok(String::from_utf8_lossy(&reply).into_owned())
}

fn is_peer_reset(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe
    )
}

/// Like [`send_request`], giving up after `limit`
pub async fn send_request_timeout(
    addr: &str,
    request: &Request,
    limit: Duration,
) -> std::io::Result<String> {
    match tokio::time::timeout(limit, send_request(addr, request)).await {
        Ok(result) => result,
        Err(_) => Err(std::io::Error::new(
            ErrorKind::TimedOut,
            format!("no reply from {} within {:?}", addr, limit),
        )),
    }
}
