use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use server::config::{load_env_file, Config, ENV_FILE};
use server::network::{Dispatcher, Server};
use server::query::BoardQuery;
use server::session::SessionManager;
use server::upstream::{Snapshot, SnapshotService};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Time allowed for the upstream session to close on shutdown
const SESSION_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Main-method of the application.
/// Starts the listener, logs on to the leaderboard service and serves until
/// Ctrl+C or until the session is lost.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let env_file = std::env::var_os("BOARDS_ENV_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(ENV_FILE));
    if load_env_file(&env_file)? {
        info!("Loaded settings from {}", env_file.display());
    }

    let config = Config::parse();
    let query_config = config.query()?;

    let snapshot = Snapshot::load(&config.snapshot)?;
    info!(
        "Loaded {} boards from {}",
        snapshot.boards.len(),
        config.snapshot.display()
    );

    // Upstream session, driven by the events the service reports
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let service = Arc::new(SnapshotService::new(snapshot, events_tx));
    let (manager, session) = SessionManager::new(service, events_rx, config.session());
    let mut session_task = tokio::spawn(manager.run());

    // Listener comes up before logon; early requests get the not-ready document
    let dispatcher = Dispatcher::new(
        BoardQuery::new(session.clone(), query_config),
        config.service_host.clone(),
    );
    let server = Server::bind(&config.listen_addr(), dispatcher).await?;
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server_task = tokio::spawn(server.run(async move {
        let _ = stop_rx.await;
    }));

    session.connect().await?;
    let result = session.login(&config.credentials()).await;
    if !result.is_ok() {
        error!("Failed to login: {:?}", result);
        std::process::exit(1);
    }

    let ended = tokio::select! {
        result = &mut session_task => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    if ended.is_none() {
        info!("Received Ctrl+C, shutting down gracefully...");
    }
    let _ = stop_tx.send(());
    if let Err(e) = server_task.await {
        error!("Network task panicked: {}", e);
    }

    let outcome = match ended {
        Some(result) => result,
        None => {
            session.shutdown().await;
            match tokio::time::timeout(SESSION_CLOSE_TIMEOUT, session_task).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Session did not close in time");
                    Ok(Ok(()))
                }
            }
        }
    };

    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!("Session ended: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            error!("Session task panicked: {}", e);
            std::process::exit(1);
        }
    }
}
