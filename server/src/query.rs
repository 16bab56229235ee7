//! Resolves a day token to a daily board through the session

use crate::error::{ConfigError, QueryError};
use crate::session::SessionHandle;
use crate::upstream::LeaderboardService;
use log::debug;
use shared::{BoardFormat, Command, LeaderboardEntry, LeaderboardHandle};

/// Which boards the adapter looks up
#[derive(Debug, Clone)]
pub struct QueryConfig {
    app_id: u32,
    board_format: BoardFormat,
}

impl QueryConfig {
    /// Fails if `board_format` has no `{}` placeholder for the day
    pub fn new(app_id: u32, board_format: impl Into<String>) -> Result<Self, ConfigError> {
        let format = board_format.into();
        let board_format =
            BoardFormat::parse(format.as_str()).ok_or(ConfigError::BoardFormat(format))?;
        Ok(Self {
            app_id,
            board_format,
        })
    }

    pub fn board_name(&self, day: &str) -> String {
        self.board_format.board_name(day)
    }
}

/// A board that exists upstream, with its entries when they were requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLeaderboard {
    pub app_id: u32,
    pub handle: LeaderboardHandle,
    /// Present for FETCH, in upstream rank order
    pub entries: Option<Vec<LeaderboardEntry>>,
}

pub struct BoardQuery<S> {
    session: SessionHandle<S>,
    config: QueryConfig,
}

impl<S: LeaderboardService> BoardQuery<S> {
    pub fn new(session: SessionHandle<S>, config: QueryConfig) -> Self {
        Self { session, config }
    }

    /// Looks up the daily board for `day`.
    ///
    /// An upstream id of 0 becomes [`QueryError::NotFound`]. FETCH also drains
    /// the entry stream. Nothing is retried here.
    pub async fn resolve(
        &self,
        command: Command,
        day: &str,
    ) -> Result<ResolvedLeaderboard, QueryError> {
        let name = self.config.board_name(day);
        let handle = self.session.query(self.config.app_id, &name).await?;

        if !handle.is_found() {
            return Err(QueryError::NotFound { name });
        }

        let entries = match command {
            Command::Info => None,
            Command::Fetch => Some(self.drain_entries(&handle).await?),
        };

        Ok(ResolvedLeaderboard {
            app_id: self.config.app_id,
            handle,
            entries,
        })
    }

    async fn drain_entries(
        &self,
        handle: &LeaderboardHandle,
    ) -> Result<Vec<LeaderboardEntry>, QueryError> {
        let mut stream = self.session.entries(self.config.app_id, handle).await?;

        let drain = async {
            let mut entries = Vec::with_capacity(handle.entry_count as usize);
            while let Some(entry) = stream.recv().await {
                entries.push(entry);
            }
            entries
        };

        let entries = tokio::time::timeout(self.session.query_timeout(), drain)
            .await
            .map_err(|_| QueryError::Timeout)?;

        debug!("Drained {} entries from {}", entries.len(), handle.name);
        Ok(entries)
    }
}
