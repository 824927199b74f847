//! Landmark frame reader
//!
//! Consumes the detector's output as line-delimited JSON, one frame per
//! line, on a dedicated thread. End of input closes the frame channel,
//! which the controller treats as a clean end of stream.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::landmarks::HandState;

/// One detector frame on the wire: `{"landmarks": [[x, y], ...]}`
#[derive(Debug, Deserialize)]
struct FrameMessage {
    #[serde(default)]
    landmarks: Option<Vec<[f64; 2]>>,
}

/// Errors that can occur while reading landmark frames
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame reader is already running")]
    AlreadyRunning,

    #[error("landmark source {} is unavailable: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("failed to spawn reader thread: {0}")]
    ThreadSpawn(String),
}

/// Parse a single frame line into a hand state
pub fn parse_frame(line: &str) -> Result<HandState, FrameError> {
    let message: FrameMessage = serde_json::from_str(line)?;
    let coords: Vec<(i32, i32)> = message
        .landmarks
        .unwrap_or_default()
        .into_iter()
        .map(|[x, y]| (x as i32, y as i32))
        .collect();
    Ok(HandState::from_xy(&coords))
}

/// Reads frames from stdin or a file/FIFO and forwards them to the controller
pub struct FrameReader {
    /// Handed to the reader thread on start; the thread holds the only
    /// sender, so end of input closes the channel
    frame_tx: Option<mpsc::Sender<HandState>>,
    running: Arc<AtomicBool>,
}

impl FrameReader {
    /// Create a new frame reader
    pub fn new(frame_tx: mpsc::Sender<HandState>) -> Self {
        Self {
            frame_tx: Some(frame_tx),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Open the source and start the reader thread
    ///
    /// The source is opened before the thread is spawned so that an
    /// unavailable source is reported to the caller at startup.
    pub fn start(&mut self, source: Option<&Path>) -> Result<(), FrameError> {
        if self.frame_tx.is_none() || self.running.swap(true, Ordering::SeqCst) {
            return Err(FrameError::AlreadyRunning);
        }

        let input: Box<dyn BufRead + Send> = match source {
            Some(path) => {
                let file = File::open(path).map_err(|source| {
                    self.running.store(false, Ordering::SeqCst);
                    FrameError::SourceUnavailable {
                        path: path.to_owned(),
                        source,
                    }
                })?;
                info!(?path, "reading landmark frames from file");
                Box::new(BufReader::new(file))
            }
            None => {
                info!("reading landmark frames from stdin");
                Box::new(BufReader::new(io::stdin()))
            }
        };

        let Some(frame_tx) = self.frame_tx.take() else {
            return Err(FrameError::AlreadyRunning);
        };
        let running = Arc::clone(&self.running);

        thread::Builder::new()
            .name("frame-reader".to_string())
            .spawn(move || {
                info!("frame reader thread started");
                let frames = read_frames(input, &frame_tx, &running);
                running.store(false, Ordering::SeqCst);
                info!(frames, "frame reader thread stopped");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                FrameError::ThreadSpawn(e.to_string())
            })?;

        Ok(())
    }

    /// Stop forwarding frames after the current line
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the reader thread is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Forward frames until end of input; returns the number of frames sent
fn read_frames(
    input: impl BufRead,
    frame_tx: &mpsc::Sender<HandState>,
    running: &AtomicBool,
) -> u64 {
    let mut sent = 0u64;

    for line in input.lines() {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!(?e, "frame read failed, ending stream");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let hand = match parse_frame(&line) {
            Ok(hand) => hand,
            Err(e) => {
                warn!(%e, "treating malformed frame as no hand");
                HandState::Absent
            }
        };

        if frame_tx.blocking_send(hand).is_err() {
            debug!("frame channel closed");
            break;
        }
        sent += 1;
    }

    sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_full_hand() {
        let coords: Vec<String> = (0..21).map(|i| format!("[{i}, {}]", i * 2)).collect();
        let line = format!(r#"{{"landmarks": [{}]}}"#, coords.join(","));
        match parse_frame(&line).unwrap() {
            HandState::Present(hand) => {
                assert!(hand.is_complete());
                assert_eq!(hand.point(20).map(|p| (p.x, p.y)), Some((20, 40)));
            }
            HandState::Absent => panic!("expected a hand"),
        }
    }

    #[test]
    fn test_parse_empty_and_null_are_absent() {
        assert_eq!(parse_frame(r#"{"landmarks": []}"#).unwrap(), HandState::Absent);
        assert_eq!(parse_frame(r#"{"landmarks": null}"#).unwrap(), HandState::Absent);
        assert_eq!(parse_frame("{}").unwrap(), HandState::Absent);
    }

    #[test]
    fn test_parse_truncates_fractional_pixels() {
        let state = parse_frame(r#"{"landmarks": [[10.9, 20.2]]}"#).unwrap();
        match state {
            HandState::Present(hand) => assert_eq!(hand.point(0).map(|p| (p.x, p.y)), Some((10, 20))),
            HandState::Absent => panic!("expected a hand"),
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_frame("not json"), Err(FrameError::Malformed(_))));
    }

    #[test]
    fn test_read_frames_degrades_malformed_lines() {
        let (tx, mut rx) = mpsc::channel(8);
        let running = AtomicBool::new(true);
        let input = Cursor::new("{\"landmarks\": [[1, 2]]}\n\ngarbage\n");

        let sent = read_frames(input, &tx, &running);
        assert_eq!(sent, 2);
        assert!(matches!(rx.try_recv().unwrap(), HandState::Present(_)));
        assert_eq!(rx.try_recv().unwrap(), HandState::Absent);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_missing_source_is_reported_at_start() {
        let (tx, _rx) = mpsc::channel(1);
        let mut reader = FrameReader::new(tx);
        let result = reader.start(Some(Path::new("/nonexistent/gesture-volume/frames")));
        assert!(matches!(result, Err(FrameError::SourceUnavailable { .. })));
        assert!(!reader.is_running());
    }

    #[tokio::test]
    async fn test_end_of_file_closes_channel_while_reader_alive() {
        let path = std::env::temp_dir().join(format!(
            "gesture-volume-frames-{}.jsonl",
            std::process::id()
        ));
        std::fs::write(&path, "{\"landmarks\": []}\n").unwrap();

        let (tx, mut rx) = mpsc::channel(4);
        let mut reader = FrameReader::new(tx);
        reader.start(Some(&path)).unwrap();

        assert_eq!(rx.recv().await, Some(HandState::Absent));
        let end = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv()).await;
        assert_eq!(end.unwrap(), None);

        // Reader is still in scope; a second start is refused
        assert!(matches!(
            reader.start(Some(&path)),
            Err(FrameError::AlreadyRunning)
        ));
        let _ = std::fs::remove_file(&path);
    }
}
