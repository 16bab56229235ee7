//! Leaderboard service backed by a recorded snapshot
//!
//! Serves boards loaded from a JSON file while behaving like a live connection:
//! it reports connects, logons and drops through [`SessionEvent`]s, refuses
//! lookups while not logged on and reconnects with capped exponential back-off.

use super::{Credentials, EntryStream, LeaderboardService, LoginResult, SessionEvent};
use crate::error::UpstreamError;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use shared::{LeaderboardEntry, LeaderboardHandle};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

const ENTRY_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Contents of a snapshot file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_server_addr")]
    pub server_addr: SocketAddr,
    #[serde(default)]
    pub boards: Vec<SnapshotBoard>,
}

/// One recorded board with its entries in rank order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotBoard {
    pub app_id: u32,
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub entries: Vec<LeaderboardEntry>,
}

fn default_server_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 27017))
}

impl Snapshot {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

#[derive(Debug, Default)]
struct Connection {
    connected: bool,
    logged_on: bool,
    login_key: bool,
    user: Option<String>,
    reconnect_attempts: u32,
    /// Bumped by `disconnect`; a pending reconnect from an older generation is dropped
    generation: u64,
}

pub struct SnapshotService {
    snapshot: Snapshot,
    connection: Arc<Mutex<Connection>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    reconnect_base: Duration,
}

impl SnapshotService {
    pub fn new(snapshot: Snapshot, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            snapshot,
            connection: Arc::new(Mutex::new(Connection::default())),
            events,
            reconnect_base: Duration::from_secs(1),
        }
    }

    /// Sets the first reconnect delay; later attempts double it
    pub fn with_reconnect_base(mut self, base: Duration) -> Self {
        self.reconnect_base = base;
        self
    }

    /// Drops the connection the way a network failure would.
    ///
    /// The login key survives, so a relogin stays possible.
    pub fn drop_connection(&self) {
        {
            let mut conn = lock(&self.connection);
            conn.connected = false;
            conn.logged_on = false;
        }
        emit(&self.events, SessionEvent::Disconnected);
    }

    fn secure_channel(&self) {
        lock(&self.connection).connected = true;
        emit(&self.events, SessionEvent::Connected(self.snapshot.server_addr));
        emit(&self.events, SessionEvent::ChannelSecured);
    }

    fn find_board(
        &self,
        app_id: u32,
        pred: impl Fn(&SnapshotBoard) -> bool,
    ) -> Option<&SnapshotBoard> {
        self.snapshot
            .boards
            .iter()
            .find(|board| board.app_id == app_id && pred(board))
    }

    fn ensure_logged_on(&self) -> Result<(), UpstreamError> {
        if lock(&self.connection).logged_on {
            Ok(())
        } else {
            Err(UpstreamError::NotConnected)
        }
    }
}

impl LeaderboardService for SnapshotService {
    async fn connect(&self) -> Result<(), UpstreamError> {
        self.secure_channel();
        Ok(())
    }

    async fn login(&self, credentials: &Credentials) -> LoginResult {
        if !lock(&self.connection).connected {
            self.secure_channel();
        }

        if credentials.username.is_empty() || credentials.password.is_empty() {
            emit(&self.events, SessionEvent::LoginError(LoginResult::InvalidPassword));
            return LoginResult::InvalidPassword;
        }

        {
            let mut conn = lock(&self.connection);
            conn.logged_on = true;
            conn.login_key = true;
            conn.user = Some(credentials.username.clone());
            conn.reconnect_attempts = 0;
        }
        emit(
            &self.events,
            SessionEvent::LoggedOn {
                user: credentials.username.clone(),
            },
        );
        LoginResult::Ok
    }

    async fn relogin(&self) -> LoginResult {
        let user = {
            let mut conn = lock(&self.connection);
            let resumable = conn.connected && conn.login_key;
            let user = conn.user.clone().filter(|_| resumable);
            if user.is_some() {
                conn.logged_on = true;
                conn.reconnect_attempts = 0;
            }
            user
        };

        match user {
            Some(user) => {
                emit(&self.events, SessionEvent::LoggedOn { user });
                LoginResult::Ok
            }
            None => {
                emit(&self.events, SessionEvent::LoginError(LoginResult::Fail));
                LoginResult::Fail
            }
        }
    }

    async fn reconnect(&self, max_delay: Duration) {
        let (delay, generation) = {
            let mut conn = lock(&self.connection);
            let factor = 1u32 << conn.reconnect_attempts.min(16);
            conn.reconnect_attempts += 1;
            ((self.reconnect_base * factor).min(max_delay), conn.generation)
        };
        emit(&self.events, SessionEvent::Reconnecting(delay));

        let connection = Arc::clone(&self.connection);
        let events = self.events.clone();
        let server_addr = self.snapshot.server_addr;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut conn = lock(&connection);
                if conn.generation != generation {
                    debug!("Reconnect cancelled");
                    return;
                }
                conn.connected = true;
            }
            emit(&events, SessionEvent::Connected(server_addr));
            emit(&events, SessionEvent::ChannelSecured);
        });
    }

    async fn logout(&self) {
        let mut conn = lock(&self.connection);
        conn.logged_on = false;
        conn.login_key = false;
        conn.user = None;
    }

    async fn disconnect(&self) {
        {
            let mut conn = lock(&self.connection);
            conn.connected = false;
            conn.logged_on = false;
            conn.generation += 1;
        }
        emit(&self.events, SessionEvent::Disconnected);
    }

    fn relogin_available(&self) -> bool {
        lock(&self.connection).login_key
    }

    fn current_server_addr(&self) -> Option<SocketAddr> {
        lock(&self.connection)
            .connected
            .then_some(self.snapshot.server_addr)
    }

    fn user_name(&self) -> Option<String> {
        let conn = lock(&self.connection);
        if conn.logged_on {
            conn.user.clone()
        } else {
            None
        }
    }

    async fn find_leaderboard(
        &self,
        app_id: u32,
        name: &str,
    ) -> Result<LeaderboardHandle, UpstreamError> {
        self.ensure_logged_on()?;

        let handle = match self.find_board(app_id, |board| board.name == name) {
            Some(board) => {
                LeaderboardHandle::new(board.id, board.name.clone(), board.entries.len() as u32)
            }
            None => LeaderboardHandle::not_found(name),
        };
        Ok(handle)
    }

    async fn entries(
        &self,
        app_id: u32,
        handle: &LeaderboardHandle,
    ) -> Result<EntryStream, UpstreamError> {
        self.ensure_logged_on()?;

        let entries = self
            .find_board(app_id, |board| board.id == handle.id)
            .map(|board| board.entries.clone())
            .ok_or_else(|| {
                UpstreamError::Request(format!("unknown leaderboard id {}", handle.id))
            })?;

        let (tx, rx) = mpsc::channel(ENTRY_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            for entry in entries {
                if tx.send(entry).await.is_err() {
                    debug!("Entry receiver dropped early");
                    break;
                }
            }
        });
        Ok(rx)
    }
}

fn lock(connection: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    connection
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn emit(events: &mpsc::UnboundedSender<SessionEvent>, event: SessionEvent) {
    if let Err(e) = events.send(event) {
        warn!("Dropped upstream event, session loop is gone: {:?}", e.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_snapshot() -> Snapshot {
        Snapshot {
            server_addr: "10.0.0.1:27017".parse().unwrap(),
            boards: vec![SnapshotBoard {
                app_id: 239350,
                id: 501,
                name: "20240101 DAILY".to_string(),
                entries: (1..=3)
                    .map(|rank| LeaderboardEntry {
                        steam_id: 1000 + rank as u64,
                        score: 900 - rank as i32,
                        global_rank: rank,
                        details: [rank as u8, 0, 0, 0, 0, 0, 0, 0],
                    })
                    .collect(),
            }],
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            username: "aggregator".to_string(),
            password: "secret".to_string(),
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_parse_snapshot_json() {
        let json = r#"{
            "boards": [
                {"app_id": 239350, "id": 7, "name": "20240101 DAILY",
                 "entries": [{"steam_id": 1, "score": 10, "global_rank": 1,
                              "details": [1, 0, 0, 0, 2, 0, 0, 0]}]}
            ]
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.server_addr, default_server_addr());
        assert_eq!(snapshot.boards.len(), 1);
        assert_eq!(snapshot.boards[0].entries[0].detail_values(), (1, 2));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Snapshot::load("/nonexistent/steamboards-snapshot.json");
        assert!(matches!(result, Err(SnapshotError::Io(_))));
    }

    #[tokio::test]
    async fn test_login_emits_connect_and_logon() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let service = SnapshotService::new(test_snapshot(), tx);

        assert_eq!(service.login(&credentials()).await, LoginResult::Ok);
        assert_eq!(
            drain(&mut rx),
            vec![
                SessionEvent::Connected("10.0.0.1:27017".parse().unwrap()),
                SessionEvent::ChannelSecured,
                SessionEvent::LoggedOn {
                    user: "aggregator".to_string()
                },
            ]
        );
        assert!(service.relogin_available());
        assert_eq!(service.user_name().as_deref(), Some("aggregator"));
    }

    #[tokio::test]
    async fn test_login_rejects_empty_password() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let service = SnapshotService::new(test_snapshot(), tx);
        let bad = Credentials {
            username: "aggregator".to_string(),
            password: String::new(),
        };

        assert_eq!(service.login(&bad).await, LoginResult::InvalidPassword);
        let events = drain(&mut rx);
        assert_eq!(
            events.last(),
            Some(&SessionEvent::LoginError(LoginResult::InvalidPassword))
        );
        assert!(!service.relogin_available());
    }

    #[tokio::test]
    async fn test_lookup_requires_logon() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let service = SnapshotService::new(test_snapshot(), tx);

        let result = service.find_leaderboard(239350, "20240101 DAILY").await;
        assert_eq!(result, Err(UpstreamError::NotConnected));
    }

    #[tokio::test]
    async fn test_find_leaderboard() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let service = SnapshotService::new(test_snapshot(), tx);
        service.login(&credentials()).await;

        let found = service.find_leaderboard(239350, "20240101 DAILY").await.unwrap();
        assert_eq!(found, LeaderboardHandle::new(501, "20240101 DAILY", 3));

        let missing = service.find_leaderboard(239350, "20991231 DAILY").await.unwrap();
        assert!(!missing.is_found());

        let other_app = service.find_leaderboard(1, "20240101 DAILY").await.unwrap();
        assert!(!other_app.is_found());
    }

    #[tokio::test]
    async fn test_entries_stream_in_rank_order() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let service = SnapshotService::new(test_snapshot(), tx);
        service.login(&credentials()).await;

        let handle = service.find_leaderboard(239350, "20240101 DAILY").await.unwrap();
        let mut stream = service.entries(239350, &handle).await.unwrap();

        let mut ranks = Vec::new();
        while let Some(entry) = stream.recv().await {
            ranks.push(entry.global_rank);
        }
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_drop_and_reconnect() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let service =
            SnapshotService::new(test_snapshot(), tx).with_reconnect_base(Duration::from_millis(5));
        service.login(&credentials()).await;
        drain(&mut rx);

        service.drop_connection();
        assert_eq!(rx.recv().await, Some(SessionEvent::Disconnected));
        assert!(service.relogin_available());
        assert!(service.current_server_addr().is_none());

        service.reconnect(Duration::from_secs(30)).await;
        assert_eq!(
            rx.recv().await,
            Some(SessionEvent::Reconnecting(Duration::from_millis(5)))
        );
        assert!(matches!(rx.recv().await, Some(SessionEvent::Connected(_))));
        assert_eq!(rx.recv().await, Some(SessionEvent::ChannelSecured));

        assert_eq!(service.relogin().await, LoginResult::Ok);
        assert!(matches!(rx.recv().await, Some(SessionEvent::LoggedOn { .. })));
    }

    #[tokio::test]
    async fn test_reconnect_delay_is_capped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let service =
            SnapshotService::new(test_snapshot(), tx).with_reconnect_base(Duration::from_secs(20));

        service.reconnect(Duration::from_secs(30)).await;
        assert_eq!(
            rx.recv().await,
            Some(SessionEvent::Reconnecting(Duration::from_secs(20)))
        );

        service.reconnect(Duration::from_secs(30)).await;
        assert_eq!(
            rx.recv().await,
            Some(SessionEvent::Reconnecting(Duration::from_secs(30)))
        );
    }

    #[tokio::test]
    async fn test_relogin_without_key_fails() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let service = SnapshotService::new(test_snapshot(), tx);
        service.connect().await.unwrap();

        assert_eq!(service.relogin().await, LoginResult::Fail);
    }

    #[tokio::test]
    async fn test_disconnect_cancels_pending_reconnect() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let service =
            SnapshotService::new(test_snapshot(), tx).with_reconnect_base(Duration::from_millis(20));
        service.login(&credentials()).await;
        service.drop_connection();
        drain(&mut rx);

        service.reconnect(Duration::from_secs(30)).await;
        service.disconnect().await;
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(
            drain(&mut rx),
            vec![
                SessionEvent::Reconnecting(Duration::from_millis(20)),
                SessionEvent::Disconnected,
            ]
        );
        assert!(service.current_server_addr().is_none());
    }

    #[tokio::test]
    async fn test_backoff_grows_until_logged_on() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let service =
            SnapshotService::new(test_snapshot(), tx).with_reconnect_base(Duration::from_millis(5));

        service.reconnect(Duration::from_secs(30)).await;
        service.reconnect(Duration::from_secs(30)).await;
        service.login(&credentials()).await;
        service.reconnect(Duration::from_secs(30)).await;

        let delays: Vec<Duration> = drain(&mut rx)
            .into_iter()
            .filter_map(|event| match event {
                SessionEvent::Reconnecting(delay) => Some(delay),
                _ => None,
            })
            .collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(5),
                Duration::from_millis(10),
                Duration::from_millis(5)
            ]
        );
    }

    #[tokio::test]
    async fn test_logout_clears_relogin() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let service = SnapshotService::new(test_snapshot(), tx);
        service.login(&credentials()).await;
        drain(&mut rx);

        service.logout().await;
        service.disconnect().await;

        assert!(!service.relogin_available());
        assert!(service.user_name().is_none());
        assert_eq!(drain(&mut rx), vec![SessionEvent::Disconnected]);
    }
}
