//! autoclicker-daemon: background daemon for hotkey-driven auto clicking
//!
//! Provides:
//! - Global trigger capture via CGEventTap (listen-only)
//! - A controller that binds triggers and toggles click loops
//! - Persistent bindings under the data directory
//! - IPC server for the settings UI

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use autoclicker::clicker::SystemClicker;
use autoclicker::config::Config;
use autoclicker::events::ControllerEvent;
use autoclicker::hotkey::{HotkeyListener, InputSource};
use autoclicker::ipc::Server;
use autoclicker::lifecycle::ShutdownSignal;
use autoclicker::store::{BindingStore, FileBackend};
use autoclicker::{AutoClickController, ControllerHandle};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "autoclicker-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, ?config.store_path, "configuration loaded");

    let shutdown = ShutdownSignal::new();

    // Controller -> IPC clients and the log below
    let (event_tx, mut event_rx) = broadcast::channel::<ControllerEvent>(64);
    // IPC server -> controller
    let (command_tx, command_rx) = mpsc::channel(32);

    let store = BindingStore::new(Arc::new(FileBackend::new(&config.store_path)));
    let controller =
        AutoClickController::load(store, Arc::new(SystemClicker::new()), event_tx.clone()).await;
    let handle = ControllerHandle::new(command_tx, controller.subscribe_snapshots());

    // Installs the event tap on its own thread; dropping the feed removes it
    let listener = HotkeyListener::new();
    let feed = listener.subscribe();
    if feed.is_available() {
        info!("hotkey listener started");
    } else {
        warn!("continuing without hotkey capture - check Accessibility permissions");
    }

    let server = Server::bind(&config.socket_path, handle, event_tx.clone())?;

    info!("daemon initialized, entering main loop");

    tokio::select! {
        _ = controller.run(feed, command_rx) => {
            info!("controller exited");
        }

        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        _ = async {
            loop {
                match event_rx.recv().await {
                    Ok(event) => info!(%event, "controller event"),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "controller event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            info!("event logger exited");
        }

        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Dropping the controller future stops click loops and removes the tap
    info!("shutting down...");
    server.shutdown().await;

    info!("autoclicker-daemon stopped");

    Ok(())
}
