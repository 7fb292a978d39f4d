//! dacvol daemon - Apple USB-C dongle volume service.
//!
//! Watches for the dongle, obtains access to it, owns the device session,
//! and serves volume-control requests from clients over a Unix socket.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod gateway;
mod prefs;
mod server;
mod signals;

use dacvol_core::{PermissionOutcome, SessionEvent, SessionManager};
use dacvol_ipc::{ErrorData, Event, EventType, IpcServer, Response};
use gateway::NodePermissionGateway;
use prefs::PrefsStore;

/// How often a pending permission request re-probes the device node.
const PERMISSION_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> Result<()> {
    // Config first: the default log filter comes from it.
    let config = config::load_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("dacvol={}", config.daemon.log_level))
        }))
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting dacvol daemon");

    let mut prefs = PrefsStore::load(PrefsStore::default_path()?)?;
    info!(volume = %prefs.get().volume, auto_apply = prefs.get().auto_apply, "Preferences loaded");

    // Permission outcomes arrive on this channel, so grants and denials
    // pass through the same loop as every other state change.
    let (outcome_tx, mut outcome_rx) = mpsc::channel::<PermissionOutcome>(16);
    let gateway = NodePermissionGateway::new(
        outcome_tx,
        Duration::from_secs(config.usb.grant_window_secs),
        PERMISSION_POLL_INTERVAL,
    );
    let manager = SessionManager::new(Box::new(gateway), Box::new(dacvol_usb::UsbDeviceOpener));

    let socket = config.daemon.socket.clone().unwrap_or_else(dacvol_ipc::socket_path);
    info!(?socket, "Starting IPC server");
    let (ipc_server, mut request_rx) =
        IpcServer::bind(&socket).await.context("Failed to start IPC server")?;
    let event_tx = ipc_server.event_sender();
    let ipc_handle = tokio::spawn(async move { ipc_server.run().await });

    let mut shutdown_rx = signals::setup_signal_handlers()?;

    let mut rescan =
        tokio::time::interval(Duration::from_secs(config.usb.rescan_interval_secs.max(1)));

    info!("Daemon running");

    loop {
        tokio::select! {
            // The first tick fires immediately and doubles as the
            // startup scan.
            _ = rescan.tick() => {
                let transitions = manager.scan(&dacvol_usb::snapshot());
                if after_transitions(&transitions, &manager, &prefs, &event_tx) {
                    break;
                }
            }

            Some(outcome) = outcome_rx.recv() => {
                let transitions = manager.handle_outcome(outcome);
                if after_transitions(&transitions, &manager, &prefs, &event_tx) {
                    break;
                }
            }

            Some((client_id, request, response_tx)) = request_rx.recv() => {
                debug!(client_id, request_id = request.id, "Handling IPC request");
                let outcome = server::dispatch(&request.method, &manager, &mut prefs);
                let response = Response { id: request.id, result: outcome.result };
                let _ = response_tx.send(response).await;
                for event in outcome.events {
                    let _ = event_tx.send(event);
                }
                if outcome.shutdown {
                    break;
                }
            }

            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("Shutting down...");
    for transition in manager.shutdown() {
        let _ = event_tx.send(server::session_event_to_ipc(&transition));
    }
    ipc_handle.abort();
    std::fs::remove_file(&socket).ok();

    info!("dacvol daemon stopped");
    Ok(())
}

/// Broadcast transition events and run the apply-on-connect behavior.
///
/// Returns true when the daemon should exit (quit-after-apply fired).
fn after_transitions(
    transitions: &[SessionEvent],
    manager: &SessionManager,
    prefs: &PrefsStore,
    event_tx: &tokio::sync::broadcast::Sender<Event>,
) -> bool {
    for transition in transitions {
        let _ = event_tx.send(server::session_event_to_ipc(transition));

        if matches!(transition, SessionEvent::Connected(_)) && prefs.get().auto_apply {
            let saved = prefs.get().volume.clone();
            match manager.apply_volume(&saved) {
                Ok(token) => {
                    info!(volume = %token, "Saved volume auto-applied");
                    let _ = event_tx.send(server::volume_applied_event(token));
                    if prefs.get().quit_after_apply {
                        info!("Quit-after-apply set, exiting");
                        return true;
                    }
                }
                Err(error) => {
                    warn!(error = %error, "Auto-apply failed");
                    let _ = event_tx.send(Event {
                        event: EventType::Error,
                        data: serde_json::to_value(ErrorData {
                            message: format!("auto-apply failed: {error}"),
                        })
                        .unwrap_or_default(),
                    });
                }
            }
        }
    }
    false
}
