use crate::session::SessionState;
use crate::upstream::LoginResult;
use shared::{NOT_FOUND_MESSAGE, NOT_READY_MESSAGE};
use thiserror::Error;

/// Failures reported by the upstream leaderboard service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("not connected to the leaderboard service")]
    NotConnected,

    #[error("leaderboard request failed: {0}")]
    Request(String),
}

/// Failures of a single board lookup made on behalf of a client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("session not ready (state: {state:?})")]
    NotReady { state: SessionState },

    #[error("leaderboard {name:?} not found")]
    NotFound { name: String },

    #[error("leaderboard service did not answer in time")]
    Timeout,

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl QueryError {
    /// Message rendered into the error document for this failure.
    ///
    /// Upstream failures and timeouts read the same as a missing board.
    pub fn client_message(&self) -> &'static str {
        match self {
            QueryError::NotReady { .. } => NOT_READY_MESSAGE,
            QueryError::NotFound { .. } | QueryError::Timeout | QueryError::Upstream(_) => {
                NOT_FOUND_MESSAGE
            }
        }
    }
}

/// Invalid startup configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("board format {0:?} has no {{}} placeholder for the day")]
    BoardFormat(String),
}

/// Failures that end the session loop and with it the process
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("failed to log on: {0:?}")]
    LoginFailed(LoginResult),

    #[error("disconnected and no relogin available")]
    SessionLost,

    #[error("upstream event channel closed")]
    EventsClosed,
}
