//! Request line parsing for the one-line leaderboard protocol
//!
//! A client sends exactly one line, `<COMMAND> <DAY>\n`, and the server answers
//! with a single document before closing. Anything that does not split into
//! exactly two whitespace separated tokens with a known command is rejected.

use std::fmt;
use thiserror::Error;

/// Longest request line accepted, newline included
pub const MAX_LINE_LEN: usize = 1024;

/// Commands understood by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Metadata plus the full ranked entry list
    Fetch,
    /// Metadata only
    Info,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Fetch => "FETCH",
            Command::Info => "INFO",
        }
    }

    fn from_token(token: &[u8]) -> Option<Self> {
        match token {
            b"FETCH" => Some(Command::Fetch),
            b"INFO" => Some(Command::Info),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a request line is dropped without a response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("expected 2 tokens, got {0}")]
    TokenCount(usize),

    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    #[error("board name is not valid UTF-8")]
    InvalidUtf8,

    #[error("request line longer than {MAX_LINE_LEN} bytes")]
    LineTooLong,
}

/// A validated request: command plus the day token naming a daily board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: Command,
    pub day: String,
}

impl Request {
    pub fn new(command: Command, day: impl Into<String>) -> Self {
        Self {
            command,
            day: day.into(),
        }
    }

    /// Parses one raw request line.
    ///
    /// The line may still carry its trailing `\n` or `\r\n`. Tokens are split on
    /// ASCII whitespace, so any run of spaces or tabs separates them.
    pub fn parse(line: &[u8]) -> Result<Self, ProtocolError> {
        if line.len() > MAX_LINE_LEN {
            return Err(ProtocolError::LineTooLong);
        }

        let tokens: Vec<&[u8]> = line
            .split(|b| b.is_ascii_whitespace())
            .filter(|t| !t.is_empty())
            .collect();

        if tokens.len() != 2 {
            return Err(ProtocolError::TokenCount(tokens.len()));
        }

        let command = Command::from_token(tokens[0]).ok_or_else(|| {
            ProtocolError::UnknownCommand(String::from_utf8_lossy(tokens[0]).into_owned())
        })?;

        let day = std::str::from_utf8(tokens[1])
            .map_err(|_| ProtocolError::InvalidUtf8)?
            .to_string();

        Ok(Self { command, day })
    }

    /// Encodes the request as the line a client sends
    pub fn to_line(&self) -> String {
        format!("{} {}\n", self.command, self.day)
    }
}
