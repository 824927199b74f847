//! Unix domain socket server for IPC
//!
//! Accepts operator commands and status queries, and pushes control
//! events to subscribed clients. A subscribed connection only receives
//! notifications from then on.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tracing::{debug, error, info, warn};

use crate::events::ControlEvent;
use crate::gesture::CalibrationRange;
use crate::state::{FrameSnapshot, OperatorCommand};

use super::protocol::{DaemonStatus, Notification, Request, Response};

const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    state: Arc<RwLock<ServerState>>,
    shutdown_tx: broadcast::Sender<()>,
    command_tx: mpsc::Sender<OperatorCommand>,
    event_tx: broadcast::Sender<ControlEvent>,
}

/// Shared server state
struct ServerState {
    status: DaemonStatus,
    /// Per-frame values published by the controller
    frames: watch::Receiver<FrameSnapshot>,
    start_time: std::time::Instant,
}

impl ServerState {
    fn new(calibration: CalibrationRange, frames: watch::Receiver<FrameSnapshot>) -> Self {
        Self {
            status: DaemonStatus::new(calibration),
            frames,
            start_time: std::time::Instant::now(),
        }
    }
}

impl Server {
    /// Create a new IPC server bound to `socket_path`
    pub fn new(
        socket_path: &Path,
        calibration: CalibrationRange,
        frames: watch::Receiver<FrameSnapshot>,
        command_tx: mpsc::Sender<OperatorCommand>,
        event_tx: broadcast::Sender<ControlEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            state: Arc::new(RwLock::new(ServerState::new(calibration, frames))),
            shutdown_tx,
            command_tx,
            event_tx,
        })
    }

    /// Fold a control event into the status snapshot
    pub async fn apply_event(&self, event: &ControlEvent) {
        let mut state = self.state.write().await;
        state.status.apply(event);
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let state = Arc::clone(&self.state);
                    let command_tx = self.command_tx.clone();
                    let event_tx = self.event_tx.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, state, command_tx, event_tx) => {
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
        mut stream: UnixStream,
        state: Arc<RwLock<ServerState>>,
        command_tx: mpsc::Sender<OperatorCommand>,
        event_tx: broadcast::Sender<ControlEvent>,
    ) -> Result<()> {
        let mut len_buf = [0u8; 4];

        loop {
            // Read message length (4-byte little-endian)
            match stream.read_exact(&mut len_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("client disconnected");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_MESSAGE_LEN {
                warn!(len, "message too large, disconnecting");
                return Ok(());
            }

            // Read message body
            let mut msg_buf = vec![0u8; len];
            stream.read_exact(&mut msg_buf).await?;

            let request: Request = match serde_json::from_slice(&msg_buf) {
                Ok(request) => request,
                Err(e) => {
                    warn!(%e, "unparseable request");
                    let response = Response::Error {
                        code: "bad_request".to_string(),
                        message: e.to_string(),
                    };
                    Self::send_message(&mut stream, &response).await?;
                    continue;
                }
            };

            debug!(?request, "received request");

            let (response, subscribe) = Self::process_request(request, &state, &command_tx).await;
            Self::send_message(&mut stream, &response).await?;

            if subscribe {
                debug!("client subscribed to notifications");
                return Self::push_notifications(stream, event_tx.subscribe()).await;
            }
        }
    }

    /// Forward control events to a subscribed client until it goes away
    async fn push_notifications(
        mut stream: UnixStream,
        mut event_rx: broadcast::Receiver<ControlEvent>,
    ) -> Result<()> {
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    let notification = Notification::Event { event };
                    if let Err(e) = Self::send_message(&mut stream, &notification).await {
                        debug!(?e, "subscriber disconnected");
                        return Ok(());
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            }
        }
    }

    /// Send a length-prefixed JSON message
    async fn send_message<T: serde::Serialize>(stream: &mut UnixStream, msg: &T) -> Result<()> {
        let msg_bytes = serde_json::to_vec(msg)?;
        let msg_len = (msg_bytes.len() as u32).to_le_bytes();

        stream.write_all(&msg_len).await?;
        stream.write_all(&msg_bytes).await?;

        Ok(())
    }

    /// Process a request and return a response
    /// Returns (Response, should_subscribe)
    async fn process_request(
        request: Request,
        state: &Arc<RwLock<ServerState>>,
        command_tx: &mpsc::Sender<OperatorCommand>,
    ) -> (Response, bool) {
        if let Some(command) = request.operator_command() {
            info!(?command, "operator command received");
            let response = match command_tx.send(command).await {
                Ok(()) => Response::Accepted,
                Err(_) => Response::Error {
                    code: "controller_stopped".to_string(),
                    message: "the control loop is no longer running".to_string(),
                },
            };
            return (response, false);
        }

        match request {
            Request::Ping => (Response::Pong, false),

            Request::GetStatus => {
                let mut state = state.write().await;
                let frame = *state.frames.borrow();
                state.status.apply_frame(&frame);
                state.status.uptime_secs = state.start_time.elapsed().as_secs();
                (Response::Status(state.status.clone()), false)
            }

            Request::Subscribe => (Response::Subscribed, true),

            // Operator commands are handled above
            _ => (
                Response::Error {
                    code: "unsupported".to_string(),
                    message: format!("{request:?} is not handled here"),
                },
                false,
            ),
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
