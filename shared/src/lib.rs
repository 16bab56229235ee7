//! # Steamboards Shared Library
//!
//! Types shared between the leaderboard server and the query client: the line
//! protocol request, leaderboard values as they arrive from the upstream service,
//! and the fixed XML documents sent back to legacy aggregation clients.
//!
//! Nothing in this crate performs I/O. Parsing and rendering are pure functions so
//! the server and client agree on the wire format byte for byte.

pub mod leaderboard;
pub mod render;
pub mod request;

pub use leaderboard::{LeaderboardEntry, LeaderboardHandle, DETAILS_LEN};
pub use render::{format_details, render_error, render_fetch, render_info};
pub use request::{Command, ProtocolError, Request, MAX_LINE_LEN};

/// TCP port the server listens on unless configured otherwise
pub const DEFAULT_PORT: u16 = 16000;
/// Application whose daily boards are served
pub const DEFAULT_APP_ID: u32 = 239350;
/// Template turning a day token into a board name; `{}` is the day
pub const DEFAULT_BOARD_FORMAT: &str = "{} DAILY";
/// Host advertised in the `<url>` element of INFO documents
pub const DEFAULT_SERVICE_HOST: &str = "mossranking.com";
/// Upper bound on the reconnect back-off, in seconds
pub const MAX_RECONNECT_DELAY_SECS: u64 = 30;

pub const NOT_FOUND_MESSAGE: &str = "Leaderboard NOT FOUND";
pub const NOT_READY_MESSAGE: &str = "Leaderboard service NOT READY";

/// Board name template with a `{}` placeholder for the day token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardFormat(String);

impl BoardFormat {
    /// Returns `None` when the template has no `{}` placeholder
    pub fn parse(format: impl Into<String>) -> Option<Self> {
        let format = format.into();
        format.contains("{}").then_some(Self(format))
    }

    /// Only the first placeholder is replaced
    pub fn board_name(&self, day: &str) -> String {
        self.0.replacen("{}", day, 1)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Expands a board name template for a given day token.
///
/// Returns `None` when the template has no `{}` placeholder.
pub fn board_name(format: &str, day: &str) -> Option<String> {
    BoardFormat::parse(format).map(|format| format.board_name(day))
}
