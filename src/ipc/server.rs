//! Unix domain socket server for IPC
//!
//! Provides request-response communication and push notifications of
//! binding snapshots and controller events to subscribed clients.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::events::ControllerEvent;
use crate::state::{Command, ControllerHandle};

use super::protocol::{Notification, Request, Response, MAX_FRAME_LEN};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    controller: ControllerHandle,
    events: broadcast::Sender<ControllerEvent>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Bind the socket, replacing a stale one left by a previous run
    pub fn bind(
        socket_path: &Path,
        controller: ControllerHandle,
        events: broadcast::Sender<ControllerEvent>,
    ) -> Result<Self> {
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))
                .context("failed to restrict socket permissions")?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            controller,
            events,
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let controller = self.controller.clone();
                    let events = self.events.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, controller, events) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(
        stream: UnixStream,
        controller: ControllerHandle,
        events: broadcast::Sender<ControllerEvent>,
    ) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let (request_tx, mut request_rx) = mpsc::channel(8);
        let reader_task = tokio::spawn(Self::read_requests(reader, request_tx));

        let mut snapshots = controller.subscribe();
        let mut event_rx: Option<broadcast::Receiver<ControllerEvent>> = None;

        let result = loop {
            tokio::select! {
                incoming = request_rx.recv() => {
                    let Some(incoming) = incoming else {
                        break Ok(());
                    };

                    let response = match incoming {
                        Ok(request) => {
                            debug!(?request, "received request");
                            let (response, subscribe) =
                                Self::process_request(request, &controller).await;
                            if subscribe && event_rx.is_none() {
                                snapshots.borrow_and_update();
                                event_rx = Some(events.subscribe());
                                debug!("client subscribed to notifications");
                            }
                            response
                        }
                        Err(message) => Response::error("bad_request", message),
                    };

                    if let Err(e) = Self::send_message(&mut writer, &response).await {
                        break Err(e);
                    }
                }

                changed = snapshots.changed(), if event_rx.is_some() => {
                    if changed.is_err() {
                        break Ok(());
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    let notification = Notification::BindingsChanged { snapshot };
                    if let Err(e) = Self::send_message(&mut writer, &notification).await {
                        break Err(e);
                    }
                }

                event = async {
                    match event_rx.as_mut() {
                        Some(rx) => rx.recv().await,
                        None => std::future::pending().await,
                    }
                } => match event {
                    Ok(event) => {
                        let notification = Notification::Event { event };
                        if let Err(e) = Self::send_message(&mut writer, &notification).await {
                            break Err(e);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "client event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break Ok(()),
                },
            }
        };

        reader_task.abort();
        result
    }

    /// Read length-prefixed requests until EOF. Unparsable frames are
    /// forwarded as errors so the client gets a response.
    async fn read_requests<R>(mut reader: R, request_tx: mpsc::Sender<Result<Request, String>>)
    where
        R: AsyncRead + Unpin,
    {
        let mut len_buf = [0u8; 4];

        loop {
            // Read message length (4-byte little-endian)
            match reader.read_exact(&mut len_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("client disconnected");
                    return;
                }
                Err(e) => {
                    warn!(?e, "client read error");
                    return;
                }
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_FRAME_LEN {
                warn!(len, "message too large, disconnecting");
                return;
            }

            // Read message body
            let mut msg_buf = vec![0u8; len];
            if let Err(e) = reader.read_exact(&mut msg_buf).await {
                warn!(?e, "client read error");
                return;
            }

            let parsed = serde_json::from_slice::<Request>(&msg_buf).map_err(|e| e.to_string());
            if request_tx.send(parsed).await.is_err() {
                return;
            }
        }
    }

    /// Send a length-prefixed JSON message
    pub(crate) async fn send_message<W, T>(stream: &mut W, msg: &T) -> Result<()>
    where
        W: AsyncWrite + Unpin,
        T: serde::Serialize,
    {
        let msg_bytes = serde_json::to_vec(msg)?;
        let msg_len = (msg_bytes.len() as u32).to_le_bytes();

        stream.write_all(&msg_len).await?;
        stream.write_all(&msg_bytes).await?;

        Ok(())
    }

    /// Process a request and return a response
    /// Returns (Response, should_subscribe)
    async fn process_request(request: Request, controller: &ControllerHandle) -> (Response, bool) {
        let command = match request {
            Request::Ping => return (Response::Pong, false),
            Request::GetBindings => {
                let snapshot = controller.snapshot();
                return (Response::Bindings { snapshot }, false);
            }
            Request::Subscribe => return (Response::Subscribed, true),
            Request::RequestListen { target } => Command::RequestListen(target),
            Request::ClearTrigger { target } => Command::ClearTrigger(target),
            Request::SetInterval { target, interval } => {
                Command::SetInterval(target, interval.resolve())
            }
        };

        match controller.send(command).await {
            Ok(()) => (Response::Accepted, false),
            Err(e) => (Response::error("controller_closed", e.to_string()), false),
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Value};
    use tempfile::TempDir;

    use super::*;
    use crate::binding::Trigger;
    use crate::clicker::RecordingClicker;
    use crate::hotkey::{InputSource, ScriptedSource};
    use crate::state::AutoClickController;
    use crate::store::BindingStore;

    async fn write_frame(stream: &mut UnixStream, value: Value) {
        Server::send_message(stream, &value).await.unwrap();
    }

    async fn read_frame(stream: &mut UnixStream) -> Value {
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.unwrap();
        let mut body = vec![0u8; u32::from_le_bytes(len_buf) as usize];
        stream.read_exact(&mut body).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    /// Read frames until one has the given `type`
    async fn read_until(stream: &mut UnixStream, kind: &str) -> Value {
        loop {
            let frame = read_frame(stream).await;
            if frame["type"] == kind {
                return frame;
            }
        }
    }

    async fn start_daemon(dir: &TempDir) -> (PathBuf, Arc<ScriptedSource>, Arc<Server>) {
        let (event_tx, _) = broadcast::channel(64);
        let controller = AutoClickController::load(
            BindingStore::in_memory(),
            Arc::new(RecordingClicker::new()),
            event_tx.clone(),
        )
        .await;

        let (command_tx, command_rx) = mpsc::channel(32);
        let handle = ControllerHandle::new(command_tx, controller.subscribe_snapshots());
        let source = Arc::new(ScriptedSource::new());
        tokio::spawn(controller.run(source.subscribe(), command_rx));

        let socket_path = dir.path().join("daemon.sock");
        let server = Arc::new(Server::bind(&socket_path, handle, event_tx).unwrap());
        let running = Arc::clone(&server);
        tokio::spawn(async move { running.run().await });

        (socket_path, source, server)
    }

    #[tokio::test]
    async fn test_ping_and_bindings() {
        let dir = TempDir::new().unwrap();
        let (socket_path, _source, server) = start_daemon(&dir).await;
        let mut client = UnixStream::connect(&socket_path).await.unwrap();

        write_frame(&mut client, json!({ "type": "ping" })).await;
        assert_eq!(read_frame(&mut client).await["type"], "pong");

        write_frame(&mut client, json!({ "type": "get_bindings" })).await;
        let frame = read_frame(&mut client).await;
        assert_eq!(frame["type"], "bindings");
        assert_eq!(frame["snapshot"]["bindings"].as_array().unwrap().len(), 2);
        assert_eq!(frame["snapshot"]["bindings"][0]["target"], "primary");

        server.shutdown().await;
        assert!(!socket_path.exists());
    }

    #[tokio::test]
    async fn test_bad_request_gets_error_response() {
        let dir = TempDir::new().unwrap();
        let (socket_path, _source, _server) = start_daemon(&dir).await;
        let mut client = UnixStream::connect(&socket_path).await.unwrap();

        write_frame(&mut client, json!({ "type": "launch_rockets" })).await;
        let frame = read_frame(&mut client).await;
        assert_eq!(frame["type"], "error");
        assert_eq!(frame["code"], "bad_request");

        // Connection stays usable
        write_frame(&mut client, json!({ "type": "ping" })).await;
        assert_eq!(read_frame(&mut client).await["type"], "pong");
    }

    #[tokio::test]
    async fn test_subscriber_sees_capture_flow() {
        let dir = TempDir::new().unwrap();
        let (socket_path, source, _server) = start_daemon(&dir).await;
        let mut client = UnixStream::connect(&socket_path).await.unwrap();

        write_frame(&mut client, json!({ "type": "subscribe" })).await;
        assert_eq!(read_frame(&mut client).await["type"], "subscribed");

        write_frame(
            &mut client,
            json!({ "type": "request_listen", "target": "secondary" }),
        )
        .await;
        let changed = read_until(&mut client, "bindings_changed").await;
        assert_eq!(changed["snapshot"]["bindings"][1]["is_listening"], true);

        source.emit(Trigger::mouse(4));
        let captured = loop {
            let frame = read_until(&mut client, "bindings_changed").await;
            if !frame["snapshot"]["bindings"][1]["trigger"].is_null() {
                break frame;
            }
        };
        assert_eq!(
            captured["snapshot"]["bindings"][1]["trigger"],
            json!({ "kind": "mouse", "button": 4 })
        );
        assert_eq!(captured["snapshot"]["bindings"][1]["is_listening"], false);
    }

    #[tokio::test]
    async fn test_set_interval_text_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        let (socket_path, _source, _server) = start_daemon(&dir).await;
        let mut client = UnixStream::connect(&socket_path).await.unwrap();

        let requests = [
            json!({ "type": "set_interval", "target": "secondary", "interval": 500 }),
            json!({ "type": "set_interval", "target": "secondary", "interval": "soon" }),
            json!({ "type": "set_interval", "target": "primary", "interval": 3000 }),
        ];
        for request in requests {
            write_frame(&mut client, request).await;
            assert_eq!(read_frame(&mut client).await["type"], "accepted");
        }

        // Commands apply in order, so once the last one lands the others have too
        loop {
            write_frame(&mut client, json!({ "type": "get_bindings" })).await;
            let frame = read_frame(&mut client).await;
            let bindings = &frame["snapshot"]["bindings"];
            if bindings[0]["interval_ms"] == 1000 {
                assert_eq!(bindings[1]["interval_ms"], 100);
                break;
            }
            tokio::task::yield_now().await;
        }
    }
}
