//! Session manager for the upstream leaderboard connection
//!
//! The [`SessionManager`] is the only owner of connection state. It consumes the
//! [`SessionEvent`]s the service reports and applies each transition in one
//! step, so readers never see a half-applied change. Request handlers hold a
//! cheap [`SessionHandle`] and check readiness before every upstream call;
//! they never wait for a reconnect.
//!
//! ```text
//! Disconnected -> Connecting -> ChannelSecured -> LoggedOn
//!                     ^                              |
//!                     +-------- Reconnecting <-------+ (relogin available)
//! ```
//!
//! A drop without relogin available, or a logon failure before the first
//! successful logon, ends [`SessionManager::run`] with an error. A failed
//! relogin later on drops the channel and goes round the reconnect loop again.

use crate::error::{QueryError, SessionError};
use crate::upstream::{Credentials, EntryStream, LeaderboardService, LoginResult, SessionEvent};
use log::{error, info, warn};
use shared::LeaderboardHandle;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Lifecycle of the upstream connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    ChannelSecured,
    LoggedOn,
    Reconnecting,
}

/// Point-in-time view of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: SessionState,
    pub server_addr: Option<SocketAddr>,
    pub relogin_available: bool,
    /// Set only while logged on
    pub user: Option<String>,
    pub last_login_result: Option<LoginResult>,
    ever_logged_on: bool,
}

impl SessionStatus {
    fn new() -> Self {
        Self {
            state: SessionState::Disconnected,
            server_addr: None,
            relogin_available: false,
            user: None,
            last_login_result: None,
            ever_logged_on: false,
        }
    }

    pub fn is_logged_on(&self) -> bool {
        self.state == SessionState::LoggedOn
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Bound on each upstream call made for a client request
    pub query_timeout: Duration,
    /// Cap on the reconnect back-off
    pub max_reconnect_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(10),
            max_reconnect_delay: Duration::from_secs(shared::MAX_RECONNECT_DELAY_SECS),
        }
    }
}

/// Owns the session state and drives it from upstream events
pub struct SessionManager<S> {
    service: Arc<S>,
    status: watch::Sender<SessionStatus>,
    shutting_down: Arc<AtomicBool>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    config: SessionConfig,
}

/// Shared access to the session for request handlers. Never writes the status.
pub struct SessionHandle<S> {
    service: Arc<S>,
    status: watch::Receiver<SessionStatus>,
    shutting_down: Arc<AtomicBool>,
    config: SessionConfig,
}

impl<S> Clone for SessionHandle<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            status: self.status.clone(),
            shutting_down: Arc::clone(&self.shutting_down),
            config: self.config,
        }
    }
}

impl<S: LeaderboardService> SessionManager<S> {
    /// Creates the manager together with the first handle onto it.
    ///
    /// `events` must be the receiving end of the channel `service` reports on.
    pub fn new(
        service: Arc<S>,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        config: SessionConfig,
    ) -> (Self, SessionHandle<S>) {
        let (status, status_rx) = watch::channel(SessionStatus::new());
        let shutting_down = Arc::new(AtomicBool::new(false));
        let handle = SessionHandle {
            service: Arc::clone(&service),
            status: status_rx,
            shutting_down: Arc::clone(&shutting_down),
            config,
        };
        let manager = Self {
            service,
            status,
            shutting_down,
            events,
            config,
        };
        (manager, handle)
    }

    /// Processes events until the session ends.
    ///
    /// Returns `Ok` after a requested shutdown and an error when the session
    /// cannot continue without a restart.
    pub async fn run(mut self) -> Result<(), SessionError> {
        while let Some(event) = self.events.recv().await {
            self.handle_event(event).await?;

            let closed =
                self.is_shutting_down() && self.status.borrow().state == SessionState::Disconnected;
            if closed {
                info!("Session closed");
                return Ok(());
            }
        }
        Err(SessionError::EventsClosed)
    }

    /// Applies one upstream event to the session state
    pub async fn handle_event(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        match event {
            SessionEvent::Connected(addr) => {
                info!("Connected to {}", addr);
                self.status.send_modify(|s| {
                    s.state = SessionState::Connecting;
                    s.server_addr = Some(addr);
                });
            }

            SessionEvent::ChannelSecured => {
                let relogin = self.service.relogin_available();
                self.status.send_modify(|s| {
                    s.state = SessionState::ChannelSecured;
                    s.relogin_available = relogin;
                });

                if self.is_shutting_down() {
                    info!("Shutting down, closing new channel");
                    self.service.disconnect().await;
                } else if relogin && self.service.user_name().is_none() {
                    // a fresh login may already be in flight on this channel
                    info!("Resuming previous session");
                    let result = self.service.relogin().await;
                    if !result.is_ok() {
                        warn!("Relogin failed: {:?}", result);
                    }
                }
            }

            SessionEvent::Reconnecting(delay) => {
                info!("Reconnect in {}s...", delay.as_secs());
                self.status.send_modify(|s| s.state = SessionState::Reconnecting);
            }

            SessionEvent::Disconnected => {
                info!("Disconnected.");
                let relogin = self.service.relogin_available();
                let shutting_down = self.is_shutting_down();

                let resume = relogin && !shutting_down;
                self.status.send_modify(|s| {
                    s.server_addr = None;
                    s.user = None;
                    s.relogin_available = relogin;
                    s.state = if resume {
                        SessionState::Reconnecting
                    } else {
                        SessionState::Disconnected
                    };
                });

                if resume {
                    info!("Reconnecting...");
                    self.service.reconnect(self.config.max_reconnect_delay).await;
                } else if !shutting_down {
                    error!("Disconnected with no relogin available, restart required");
                    return Err(SessionError::SessionLost);
                }
            }

            SessionEvent::LoginError(result) => {
                info!("Logon result: {:?}", result);
                let ever_logged_on = self.status.borrow().ever_logged_on;
                self.status.send_modify(|s| s.last_login_result = Some(result));

                if !ever_logged_on {
                    error!("Failed to login: {:?}", result);
                    return Err(SessionError::LoginFailed(result));
                }
                if self.is_shutting_down() {
                    return Ok(());
                }

                if self.service.relogin_available() {
                    warn!("Relogin rejected, dropping the channel to retry");
                    self.service.disconnect().await;
                } else {
                    error!("Logon lost with no relogin available, restart required");
                    self.status.send_modify(|s| {
                        s.state = SessionState::Disconnected;
                        s.server_addr = None;
                        s.user = None;
                        s.relogin_available = false;
                    });
                    return Err(SessionError::SessionLost);
                }
            }

            SessionEvent::LoggedOn { user } => {
                info!("Logged on as: {}", user);
                let relogin = self.service.relogin_available();
                self.status.send_modify(|s| {
                    s.state = SessionState::LoggedOn;
                    s.user = Some(user);
                    s.relogin_available = relogin;
                    s.last_login_result = Some(LoginResult::Ok);
                    s.ever_logged_on = true;
                });
            }
        }

        Ok(())
    }

    fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}

impl<S: LeaderboardService> SessionHandle<S> {
    pub async fn connect(&self) -> Result<(), QueryError> {
        self.service.connect().await?;
        Ok(())
    }

    /// Logs on with an explicit account.
    ///
    /// The state moves to `LoggedOn` once the manager sees the service report
    /// the logon.
    pub async fn login(&self, credentials: &Credentials) -> LoginResult {
        self.service.login(credentials).await
    }

    pub fn is_ready(&self) -> bool {
        self.status.borrow().is_logged_on()
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn query_timeout(&self) -> Duration {
        self.config.query_timeout
    }

    /// Waits until the session is logged on or `limit` elapses
    pub async fn wait_ready(&self, limit: Duration) -> bool {
        let mut rx = self.status.clone();
        let ready = matches!(
            tokio::time::timeout(limit, rx.wait_for(|s| s.is_logged_on())).await,
            Ok(Ok(_))
        );
        ready
    }

    /// Looks up a board by name. Fails at once unless logged on.
    pub async fn query(&self, app_id: u32, name: &str) -> Result<LeaderboardHandle, QueryError> {
        self.ensure_ready()?;

        match tokio::time::timeout(
            self.config.query_timeout,
            self.service.find_leaderboard(app_id, name),
        )
        .await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(QueryError::Timeout),
        }
    }

    /// Opens the ranked entry stream of a resolved board
    pub async fn entries(
        &self,
        app_id: u32,
        handle: &LeaderboardHandle,
    ) -> Result<EntryStream, QueryError> {
        self.ensure_ready()?;

        match tokio::time::timeout(
            self.config.query_timeout,
            self.service.entries(app_id, handle),
        )
        .await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(QueryError::Timeout),
        }
    }

    /// Logs out and closes the upstream connection, cancelling any pending
    /// reconnect.
    ///
    /// [`SessionManager::run`] returns once the service reports the disconnect.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);

        if self.service.relogin_available() || self.service.user_name().is_some() {
            info!("Logout");
            self.service.logout().await;
        }
        self.service.disconnect().await;
    }

    fn ensure_ready(&self) -> Result<(), QueryError> {
        let state = self.status.borrow().state;
        if state == SessionState::LoggedOn {
            Ok(())
        } else {
            Err(QueryError::NotReady { state })
        }
    }
}
