//! # Leaderboard Server Library
//!
//! Answers one-line `INFO`/`FETCH` requests from legacy leaderboard aggregation
//! clients by querying a remote leaderboard service and rendering the result as
//! a fixed XML document.
//!
//! ## Architecture
//!
//! Two independent halves share a single piece of state:
//!
//! ### Session (`session`)
//! A long-lived connection to the leaderboard service. The session manager owns
//! the connect / logon / reconnect state machine and is driven purely by events
//! the service reports. It is the only writer of the session state.
//!
//! ### Request handling (`network`, `query`)
//! The listener accepts connections and serves each one on its own task: read
//! one line, resolve the daily board through the session, render, write, close.
//! Handlers only read the session state; a lookup made while the session is not
//! logged on fails at once instead of waiting for a reconnect.
//!
//! ## Module Organization
//!
//! - `config`: command line and environment options
//! - `error`: error types for upstream calls, lookups and the session
//! - `network`: TCP listener and per-connection protocol handling
//! - `query`: day token to daily board resolution
//! - `session`: session state machine and the handle request tasks use
//! - `upstream`: the leaderboard service interface and a snapshot-backed
//!   implementation
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Dispatcher, Server};
//! use server::query::{BoardQuery, QueryConfig};
//! use server::session::{SessionConfig, SessionManager};
//! use server::upstream::{Credentials, Snapshot, SnapshotService};
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (events_tx, events_rx) = mpsc::unbounded_channel();
//!     let service = Arc::new(SnapshotService::new(Snapshot::load("boards.json")?, events_tx));
//!     let (manager, session) = SessionManager::new(service, events_rx, SessionConfig::default());
//!     tokio::spawn(manager.run());
//!
//!     let query = BoardQuery::new(session.clone(), QueryConfig::new(239350, "{} DAILY")?);
//!     let server = Server::bind("0.0.0.0:16000", Dispatcher::new(query, "mossranking.com")).await?;
//!
//!     let credentials = Credentials {
//!         username: "user".into(),
//!         password: "pass".into(),
//!     };
//!     session.login(&credentials).await;
//!     server.run(async { tokio::signal::ctrl_c().await.ok(); }).await;
//!     session.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod network;
pub mod query;
pub mod session;
pub mod upstream;

#[cfg(test)]
mod testing;
