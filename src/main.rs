//! gesture-volume-daemon: Hand-gesture volume control for macOS
//!
//! This daemon reads hand landmarks from an external detector and provides:
//! - Pinch-distance volume control with live calibration
//! - Debounced closed-fist mute toggling
//! - IPC server for operator commands and status queries
//!
//! Scope:
//! - One hand, two gestures (pinch distance, closed fist)
//! - Landmarks arrive as line-delimited JSON on stdin or a FIFO
//! - NO camera capture, landmark detection, or on-screen rendering

mod audio;
mod config;
mod events;
mod gesture;
mod hand;
mod ipc;
mod lifecycle;
mod state;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::audio::{AudioSink, DryRunSink, OsascriptSink};
use crate::config::Config;
use crate::events::ControlEvent;
use crate::hand::{FrameReader, HandState};
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::state::Controller;

/// Frames buffered between the reader thread and the controller
const FRAME_QUEUE: usize = 4;

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
        "gesture-volume-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    info!(
        ?config.socket_path,
        ?config.landmark_source,
        dry_run = config.dry_run,
        "configuration loaded"
    );

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Frame reader -> controller
    let (frame_tx, frame_rx) = mpsc::channel::<HandState>(FRAME_QUEUE);
    // IPC server -> controller
    let (command_tx, command_rx) = mpsc::channel(16);
    // Controller -> IPC server and subscribers
    let (event_tx, _event_rx) = broadcast::channel::<ControlEvent>(256);

    let sink: Box<dyn AudioSink> = if config.dry_run {
        Box::new(DryRunSink)
    } else {
        Box::new(OsascriptSink::new())
    };
    let mut controller = Controller::new(&config, sink, event_tx.clone());

    // An unavailable landmark source is fatal before the loop starts
    let mut frame_reader = FrameReader::new(frame_tx);
    frame_reader
        .start(config.landmark_source.as_deref())
        .context("could not open landmark source")?;

    let server = Server::new(
        &config.socket_path,
        controller.calibration(),
        controller.subscribe_snapshot(),
        command_tx,
        event_tx.clone(),
    )?;

    // Keep the status snapshot in sync with controller events
    let mut status_rx = event_tx.subscribe();
    let server_for_events = &server;

    info!("daemon initialized, entering main loop");

    tokio::select! {
        // Run the control loop (processes frames and operator commands)
        _ = controller.run(frame_rx, command_rx) => {
            info!("controller exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Fold control events into the IPC status
        _ = async {
            loop {
                match status_rx.recv().await {
                    Ok(event) => {
                        debug!(%event, "control event");
                        server_for_events.apply_event(&event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "control event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {
            info!("control event handler exited");
        }

        // Wait for shutdown signal
        result = shutdown.wait() => match result {
            Ok(()) => info!("shutdown signal received"),
            Err(e) => error!(?e, "failed to register signal handlers"),
        }
    }

    // Cleanup
    info!("shutting down...");

    if frame_reader.is_running() {
        frame_reader.stop();
    }
    server.shutdown().await;

    info!(muted = controller.is_muted(), "gesture-volume-daemon stopped");

    Ok(())
}
