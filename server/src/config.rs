//! Command line and environment configuration

use crate::error::ConfigError;
use crate::query::QueryConfig;
use crate::session::SessionConfig;
use crate::upstream::Credentials;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings file read before the command line is parsed
pub const ENV_FILE: &str = "steamboards.env";

/// Loads `KEY=value` lines from `path` into the environment.
///
/// Variables that are already set keep their value. Returns `false` when the
/// file does not exist.
pub fn load_env_file(path: impl AsRef<Path>) -> Result<bool, dotenvy::Error> {
    match dotenvy::from_path(path.as_ref()) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Serves daily leaderboards to legacy aggregation clients
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address to bind the listener to
    #[arg(short = 'H', long, env = "BOARDS_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "BOARDS_PORT", default_value_t = shared::DEFAULT_PORT)]
    pub port: u16,

    /// Application whose daily boards are served
    #[arg(long, env = "BOARDS_APP_ID", default_value_t = shared::DEFAULT_APP_ID)]
    pub app_id: u32,

    /// Board name template, `{}` is replaced by the requested day
    #[arg(long, env = "BOARDS_BOARD_FORMAT", default_value = shared::DEFAULT_BOARD_FORMAT)]
    pub board_format: String,

    /// Host advertised in INFO urls
    #[arg(long, env = "BOARDS_SERVICE_HOST", default_value = shared::DEFAULT_SERVICE_HOST)]
    pub service_host: String,

    /// Account used to log on to the leaderboard service
    #[arg(long, env = "STEAM_USERNAME")]
    pub username: String,

    #[arg(long, env = "STEAM_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Recorded leaderboards to serve
    #[arg(long, env = "BOARDS_SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Seconds to wait on the leaderboard service per request
    #[arg(long, env = "BOARDS_QUERY_TIMEOUT", default_value_t = 10)]
    pub query_timeout: u64,

    /// Upper bound in seconds on the reconnect back-off
    #[arg(
        long,
        env = "BOARDS_MAX_RECONNECT_DELAY",
        default_value_t = shared::MAX_RECONNECT_DELAY_SECS
    )]
    pub max_reconnect_delay: u64,
}

impl Config {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            query_timeout: Duration::from_secs(self.query_timeout),
            max_reconnect_delay: Duration::from_secs(self.max_reconnect_delay),
        }
    }

    pub fn query(&self) -> Result<QueryConfig, ConfigError> {
        QueryConfig::new(self.app_id, self.board_format.clone())
    }
}
