//! Fixtures shared by the unit tests

use crate::error::UpstreamError;
use crate::session::{SessionConfig, SessionHandle, SessionManager};
use crate::upstream::{
    Credentials, EntryStream, LeaderboardService, LoginResult, SessionEvent, Snapshot,
    SnapshotBoard, SnapshotService,
};
use shared::{LeaderboardEntry, LeaderboardHandle};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const APP_ID: u32 = 239350;

pub fn entry(rank: u32, details: [u8; 8]) -> LeaderboardEntry {
    LeaderboardEntry {
        steam_id: 76561198000000000 + rank as u64,
        score: 10_000 - rank as i32 * 10,
        global_rank: rank,
        details,
    }
}

pub fn board(id: u64, day: &str, entries: Vec<LeaderboardEntry>) -> SnapshotBoard {
    SnapshotBoard {
        app_id: APP_ID,
        id,
        name: format!("{} DAILY", day),
        entries,
    }
}

pub fn snapshot(boards: Vec<SnapshotBoard>) -> Snapshot {
    Snapshot {
        server_addr: "10.0.0.1:27017".parse().unwrap(),
        boards,
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        username: "aggregator".to_string(),
        password: "secret".to_string(),
    }
}

/// Session that is logged on, with its event loop driven by hand.
///
/// The manager is returned so the event channel stays open.
pub async fn logged_on(
    snapshot: Snapshot,
) -> (SessionManager<SnapshotService>, SessionHandle<SnapshotService>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let service = Arc::new(SnapshotService::new(snapshot, tx));
    let (mut manager, handle) =
        SessionManager::new(Arc::clone(&service), rx, SessionConfig::default());

    service.login(&credentials()).await;
    manager
        .handle_event(SessionEvent::LoggedOn {
            user: "aggregator".to_string(),
        })
        .await
        .unwrap();

    (manager, handle)
}

/// Upstream that answers logon but leaves lookups hanging.
///
/// With `stall_lookup` unset, lookups resolve and the entry stream delivers one
/// entry, then stays open forever.
pub struct StalledService {
    stall_lookup: bool,
    open_streams: Mutex<Vec<mpsc::Sender<LeaderboardEntry>>>,
}

impl StalledService {
    pub fn new(stall_lookup: bool) -> Self {
        Self {
            stall_lookup,
            open_streams: Mutex::new(Vec::new()),
        }
    }
}

impl LeaderboardService for StalledService {
    async fn connect(&self) -> Result<(), UpstreamError> {
        Ok(())
    }

    async fn login(&self, _credentials: &Credentials) -> LoginResult {
        LoginResult::Ok
    }

    async fn relogin(&self) -> LoginResult {
        LoginResult::Ok
    }

    async fn reconnect(&self, _max_delay: Duration) {}

    async fn logout(&self) {}

    async fn disconnect(&self) {}

    fn relogin_available(&self) -> bool {
        true
    }

    fn current_server_addr(&self) -> Option<SocketAddr> {
        None
    }

    fn user_name(&self) -> Option<String> {
        Some("aggregator".to_string())
    }

    async fn find_leaderboard(
        &self,
        _app_id: u32,
        name: &str,
    ) -> Result<LeaderboardHandle, UpstreamError> {
        if self.stall_lookup {
            std::future::pending::<()>().await;
        }
        Ok(LeaderboardHandle::new(7, name, 2))
    }

    async fn entries(
        &self,
        _app_id: u32,
        _handle: &LeaderboardHandle,
    ) -> Result<EntryStream, UpstreamError> {
        let (tx, rx) = mpsc::channel(4);
        let _ = tx.try_send(entry(1, [0; 8]));
        self.open_streams
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(tx);
        Ok(rx)
    }
}

/// Logged-on session over a [`StalledService`] with a short query timeout
pub async fn stalled(
    stall_lookup: bool,
    query_timeout: Duration,
) -> (SessionManager<StalledService>, SessionHandle<StalledService>) {
    let (_tx, rx) = mpsc::unbounded_channel();
    let config = SessionConfig {
        query_timeout,
        ..SessionConfig::default()
    };
    let (mut manager, handle) =
        SessionManager::new(Arc::new(StalledService::new(stall_lookup)), rx, config);

    manager
        .handle_event(SessionEvent::LoggedOn {
            user: "aggregator".to_string(),
        })
        .await
        .unwrap();

    (manager, handle)
}
