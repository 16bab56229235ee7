//! Interface to the external leaderboard service
//!
//! The server never talks to the service's wire protocol directly. It drives a
//! [`LeaderboardService`] and listens for [`SessionEvent`]s the service pushes on
//! the channel it was built with.

pub mod snapshot;

use crate::error::UpstreamError;
use shared::{LeaderboardEntry, LeaderboardHandle};
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::mpsc;

pub use snapshot::{Snapshot, SnapshotBoard, SnapshotService};

/// Ranked entries of one board, in upstream rank order. Consumed once.
pub type EntryStream = mpsc::Receiver<LeaderboardEntry>;

/// Connectivity events reported by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connected(SocketAddr),
    ChannelSecured,
    Disconnected,
    /// Next reconnect attempt fires after this delay
    Reconnecting(Duration),
    LoginError(LoginResult),
    LoggedOn {
        user: String,
    },
}

/// Outcome of a logon attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginResult {
    Ok,
    Fail,
    InvalidPassword,
    AccountLogonDenied,
    RateLimitExceeded,
    ServiceUnavailable,
    Timeout,
    TryAnotherCm,
}

impl LoginResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, LoginResult::Ok)
    }
}

/// Account used to log on to the service
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Client for the remote leaderboard service
///
/// Connection state changes are not returned from these calls; they arrive as
/// [`SessionEvent`]s.
pub trait LeaderboardService: Send + Sync + 'static {
    fn connect(&self) -> impl Future<Output = Result<(), UpstreamError>> + Send;

    /// Connects if needed and logs on with the given account
    fn login(&self, credentials: &Credentials) -> impl Future<Output = LoginResult> + Send;

    /// Resumes the previous session without resubmitting credentials
    fn relogin(&self) -> impl Future<Output = LoginResult> + Send;

    /// Schedules reconnect attempts with back-off up to `max_delay`
    fn reconnect(&self, max_delay: Duration) -> impl Future<Output = ()> + Send;

    fn logout(&self) -> impl Future<Output = ()> + Send;

    /// Closes the connection and cancels any pending reconnect.
    ///
    /// Always reports `Disconnected`, connected or not.
    fn disconnect(&self) -> impl Future<Output = ()> + Send;

    fn relogin_available(&self) -> bool;

    fn current_server_addr(&self) -> Option<SocketAddr>;

    fn user_name(&self) -> Option<String>;

    /// Looks up a board by name. A missing board yields a handle with id 0.
    fn find_leaderboard(
        &self,
        app_id: u32,
        name: &str,
    ) -> impl Future<Output = Result<LeaderboardHandle, UpstreamError>> + Send;

    fn entries(
        &self,
        app_id: u32,
        handle: &LeaderboardHandle,
    ) -> impl Future<Output = Result<EntryStream, UpstreamError>> + Send;
}
