//! IPC server implementation.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::error::IpcResult;
use crate::events::{Event, EventType};
use crate::messages::{Method, Request, Response};

/// A request forwarded to the daemon loop, with the channel to answer on.
pub type InboundRequest = (u64, Request, mpsc::Sender<Response>);

/// IPC server that listens for client connections.
///
/// Requests are forwarded to the daemon loop; `Subscribe` is the one
/// method handled here, since subscriptions are per-connection state.
pub struct IpcServer {
    listener: UnixListener,
    next_client_id: AtomicU64,
    event_tx: broadcast::Sender<Event>,
    request_tx: mpsc::Sender<InboundRequest>,
}

impl IpcServer {
    /// Create a new IPC server bound to the given socket path.
    ///
    /// # Errors
    /// Returns an error if the socket cannot be created.
    pub async fn bind(socket_path: &Path) -> IpcResult<(Self, mpsc::Receiver<InboundRequest>)> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Remove stale socket file if it exists
        if socket_path.exists() {
            tokio::fs::remove_file(socket_path).await?;
        }

        let listener = UnixListener::bind(socket_path)?;
        info!(?socket_path, "IPC server listening");

        let (event_tx, _) = broadcast::channel(256);
        let (request_tx, request_rx) = mpsc::channel(64);

        Ok((Self { listener, next_client_id: AtomicU64::new(1), event_tx, request_tx }, request_rx))
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, _)) => {
                    let client_id = self.next_client_id.fetch_add(1, Ordering::SeqCst);
                    info!(client_id, "Client connected");

                    let event_rx = self.event_tx.subscribe();
                    let request_tx = self.request_tx.clone();

                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_client(client_id, stream, event_rx, request_tx).await
                        {
                            error!(client_id, error = %e, "Client error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Accept error");
                }
            }
        }
    }

    /// Broadcast an event to all subscribed clients.
    pub fn broadcast(&self, event: Event) {
        let _ = self.event_tx.send(event);
    }

    /// Get a clone of the event sender for broadcasting from other tasks.
    #[must_use]
    pub fn event_sender(&self) -> broadcast::Sender<Event> {
        self.event_tx.clone()
    }
}

async fn handle_client(
    client_id: u64,
    stream: UnixStream,
    mut event_rx: broadcast::Receiver<Event>,
    request_tx: mpsc::Sender<InboundRequest>,
) -> IpcResult<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    let (response_tx, mut response_rx) = mpsc::channel::<Response>(16);

    // Empty means "everything" until the client narrows it down.
    let mut subscriptions: Vec<EventType> = Vec::new();

    loop {
        tokio::select! {
            // Read request from client
            result = reader.read_line(&mut line) => {
                match result {
                    Ok(0) => {
                        debug!(client_id, "Client disconnected");
                        break;
                    }
                    Ok(_) => {
                        if let Ok(request) = serde_json::from_str::<Request>(&line) {
                            debug!(client_id, request_id = request.id, "Received request");
                            if let Method::Subscribe { events } = &request.method {
                                subscriptions = events.clone();
                                let response = Response {
                                    id: request.id,
                                    result: Ok(serde_json::json!({"subscribed": true})),
                                };
                                send_json(&mut writer, &response).await?;
                            } else {
                                let _ = request_tx.send((client_id, request, response_tx.clone())).await;
                            }
                        } else {
                            warn!(client_id, "Invalid request format");
                        }
                        line.clear();
                    }
                    Err(e) => {
                        error!(client_id, error = %e, "Read error");
                        break;
                    }
                }
            }

            // Send response to client
            Some(response) = response_rx.recv() => {
                send_json(&mut writer, &response).await?;
            }

            // Forward events to client
            Ok(event) = event_rx.recv() => {
                if subscriptions.is_empty() || subscriptions.contains(&event.event) {
                    send_json(&mut writer, &event).await?;
                }
            }
        }
    }

    info!(client_id, "Client handler exiting");
    Ok(())
}

async fn send_json<T: serde::Serialize>(
    writer: &mut tokio::net::unix::OwnedWriteHalf,
    value: &T,
) -> IpcResult<()> {
    let mut json = serde_json::to_string(value)?;
    json.push('\n');
    writer.write_all(json.as_bytes()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::client::IpcClient;
    use crate::events::VolumeAppliedData;

    async fn bind_server(dir: &tempfile::TempDir) -> (IpcServer, mpsc::Receiver<InboundRequest>) {
        let path = dir.path().join("daemon.sock");
        IpcServer::bind(&path).await.expect("bind failed")
    }

    #[tokio::test]
    async fn test_request_response_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.sock");
        let (server, mut request_rx) = bind_server(&dir).await;

        tokio::spawn(async move { server.run().await });
        tokio::spawn(async move {
            while let Some((_, request, tx)) = request_rx.recv().await {
                let response = Response { id: request.id, result: Ok(json!({"ok": true})) };
                let _ = tx.send(response).await;
            }
        });

        let client = IpcClient::connect(&path).await.unwrap();
        let response = client.request(Method::GetStatus).await.unwrap();
        assert_eq!(response.result.unwrap(), json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_subscribe_filters_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.sock");
        let (server, _request_rx) = bind_server(&dir).await;

        let event_tx = server.event_sender();
        tokio::spawn(async move { server.run().await });

        let mut client = IpcClient::connect(&path).await.unwrap();
        // The subscription is in place once the response arrives.
        client
            .request(Method::Subscribe { events: vec![EventType::VolumeApplied] })
            .await
            .unwrap();

        let _ = event_tx.send(Event { event: EventType::DeviceDisconnected, data: json!({}) });
        let _ = event_tx.send(Event {
            event: EventType::VolumeApplied,
            data: serde_json::to_value(VolumeAppliedData { volume: "007F".into() }).unwrap(),
        });

        let event = client.events().recv().await.unwrap();
        assert_eq!(event.event, EventType::VolumeApplied);
    }
}
