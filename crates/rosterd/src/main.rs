//! rosterd - The duty roster service
//!
//! This is the main entry point for the rosterd service.
//! It wires together all the components:
//! - Configuration loading
//! - Ledger file store
//! - Shift ledger and access policy
//! - IPC server

use anyhow::{Context, Result, bail};
use clap::Parser;
use roster_config::load_config;
use roster_core::{LedgerError, ShiftLedger};
use roster_ipc::{IpcServer, ServerMessage};
use roster_store::{JsonFileStore, LedgerStore, StoreError};
use roster_util::{Clock, SystemClock, default_config_path};
use rosterd::Handler;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// rosterd - Duty shift ledger for a community chat server
#[derive(Parser, Debug)]
#[command(name = "rosterd")]
#[command(about = "Duty shift ledger for a community chat server", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/rosterd/config.toml)
    #[arg(short, long, env = "ROSTER_CONFIG", default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set ROSTER_SOCKET env var)
    #[arg(short, long, env = "ROSTER_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set ROSTER_DATA_DIR env var)
    #[arg(short, long, env = "ROSTER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Move an unreadable ledger file aside and start with an empty ledger
    #[arg(long)]
    quarantine_corrupt: bool,
}

/// Main service state
struct Service {
    config_path: PathBuf,
    handler: Arc<Handler>,
    ipc: Arc<IpcServer>,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let policy = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            staff_roles = policy.access.staff_roles.len(),
            admin_roles = policy.access.admin_roles.len(),
            "Configuration loaded"
        );

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| policy.service.socket_path.clone());

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| policy.service.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let ledger_path = data_dir.join(&policy.service.ledger_file);
        let ledger = open_ledger(&ledger_path, args.quarantine_corrupt)?;

        info!(
            ledger_path = %ledger_path.display(),
            on_duty = ledger.on_duty_count(),
            history = ledger.history_len(),
            "Ledger ready"
        );

        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        if roster_util::is_mock_time_active() {
            warn!("Mock time is active, shift times will not match the wall clock");
        }

        let handler = Handler::new(ledger, &policy, clock);

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start()
            .await
            .with_context(|| format!("Failed to listen on {:?}", socket_path))?;

        Ok(Self {
            config_path: args.config.clone(),
            handler: Arc::new(handler),
            ipc: Arc::new(ipc),
        })
    }

    async fn run(self) -> Result<()> {
        let mut ipc_messages = self
            .ipc
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;

        let ipc_accept = self.ipc.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup =
            signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }

                // SIGHUP: re-read roles and query defaults
                _ = sighup.recv() => {
                    self.reload_config().await;
                }

                Some(msg) = ipc_messages.recv() => {
                    let handler = self.handler.clone();
                    let ipc = self.ipc.clone();
                    tokio::spawn(async move {
                        Self::handle_ipc_message(&handler, &ipc, msg).await;
                    });
                }
            }
        }

        info!("Shutting down rosterd");

        // Every change is saved before it is acknowledged, so there is
        // nothing to flush; waiting for the lock lets an in-flight save finish.
        {
            let ledger = self.handler.ledger().lock().await;
            info!(
                on_duty = ledger.on_duty_count(),
                history = ledger.history_len(),
                "Ledger closed"
            );
        }

        self.ipc.shutdown();
        info!("Shutdown complete");
        Ok(())
    }

    async fn reload_config(&self) {
        match load_config(&self.config_path) {
            Ok(policy) => {
                debug!(
                    socket_path = %policy.service.socket_path.display(),
                    data_dir = %policy.service.data_dir.display(),
                    "Service paths only take effect after a restart"
                );
                self.handler.reload(&policy).await;
            }
            Err(e) => {
                warn!(
                    error = %e,
                    config_path = %self.config_path.display(),
                    "Config reload failed, keeping current rules"
                );
            }
        }
    }

    async fn handle_ipc_message(handler: &Handler, ipc: &IpcServer, msg: ServerMessage) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                let Some(info) = ipc.get_client_info(&client_id).await else {
                    debug!(client_id = %client_id, "Request from departed client dropped");
                    return;
                };

                let outcome = handler.handle(&info, request).await;

                // Reply first so a new subscriber sees it before any event
                if let Err(e) = ipc.send_response(&client_id, outcome.response).await {
                    debug!(client_id = %client_id, error = %e, "Response not delivered");
                }

                if let Some(subscribed) = outcome.subscribe {
                    ipc.set_subscribed(&client_id, subscribed).await;
                    debug!(client_id = %client_id, subscribed, "Subscription changed");
                }

                // The ledger lock is already released here
                if let Some(event) = outcome.event {
                    ipc.broadcast_event(event);
                }
            }

            ServerMessage::ClientConnected { client_id, info } => {
                debug!(
                    client_id = %client_id,
                    trust = ?info.trust,
                    uid = ?info.uid,
                    "Client registered"
                );
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");
            }
        }
    }
}

/// Load the ledger, optionally quarantining a corrupt file
fn open_ledger(path: &Path, quarantine_corrupt: bool) -> Result<ShiftLedger> {
    let store = Arc::new(JsonFileStore::new(path));

    match ShiftLedger::open(store.clone()) {
        Ok(ledger) => Ok(ledger),
        Err(LedgerError::Storage(StoreError::Corrupt { path, message })) => {
            if !quarantine_corrupt {
                bail!(
                    "Ledger file {:?} is corrupt ({}). Fix or restore it, or restart with \
                     --quarantine-corrupt to move it aside and start empty",
                    path,
                    message
                );
            }

            let moved = store
                .quarantine()
                .with_context(|| format!("Failed to quarantine {:?}", path))?;
            warn!(moved_to = ?moved, reason = %message, "Starting with an empty ledger");

            if !store.is_healthy() {
                bail!("Ledger directory for {:?} is not usable", path);
            }
            ShiftLedger::open(store).context("Failed to open ledger after quarantine")
        }
        Err(e) => Err(e).with_context(|| format!("Failed to open ledger {:?}", path)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins over --log-level
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "rosterd starting");

    let service = Service::new(&args).await?;
    service.run().await
}
