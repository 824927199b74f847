//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::events::ControlEvent;
use crate::gesture::CalibrationRange;
use crate::state::{FrameSnapshot, OperatorCommand};

/// Requests from an operator client to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current daemon status
    GetStatus,

    /// Use the current pinch distance as the 0% bound
    SetMinFromCurrentDistance,

    /// Use the current pinch distance as the 100% bound
    SetMaxFromCurrentDistance,

    /// Restore default calibration
    ResetCalibration,

    /// Stop the daemon
    Quit,

    /// Ping to check connectivity
    Ping,

    /// Subscribe to control event notifications
    Subscribe,
}

impl Request {
    /// The operator command this request forwards to the controller, if any
    pub fn operator_command(&self) -> Option<OperatorCommand> {
        match self {
            Request::SetMinFromCurrentDistance => Some(OperatorCommand::SetMinFromCurrentDistance),
            Request::SetMaxFromCurrentDistance => Some(OperatorCommand::SetMaxFromCurrentDistance),
            Request::ResetCalibration => Some(OperatorCommand::ResetCalibration),
            Request::Quit => Some(OperatorCommand::Quit),
            Request::GetStatus | Request::Ping | Request::Subscribe => None,
        }
    }
}

/// Responses from daemon to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current daemon status
    Status(DaemonStatus),

    /// Operator command queued for the controller
    Accepted,

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

/// Push notification from daemon to subscribed clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Control event occurred
    Event { event: ControlEvent },
}

/// Full daemon status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Last volume sent to the audio sink
    pub volume_percent: Option<u8>,

    /// Smoothed percent of the latest frame, or the history mean without a hand
    pub display_percent: u8,

    /// Pinch distance of the latest frame, if it had a trackable hand
    pub pinch_distance: Option<f64>,

    /// Whether output is muted
    pub muted: bool,

    /// Current calibration range
    pub calibration: CalibrationRange,

    /// Whether a trackable hand is in view
    pub hand_present: bool,

    /// Whether the landmark stream is still delivering frames
    pub streaming: bool,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl DaemonStatus {
    pub fn new(calibration: CalibrationRange) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            volume_percent: None,
            display_percent: 0,
            pinch_distance: None,
            muted: false,
            calibration,
            hand_present: false,
            streaming: true,
            uptime_secs: 0,
        }
    }

    /// Fold a control event into the snapshot
    pub fn apply(&mut self, event: &ControlEvent) {
        match *event {
            ControlEvent::VolumeChanged { percent } => self.volume_percent = Some(percent),
            ControlEvent::MuteToggled { muted } => self.muted = muted,
            ControlEvent::CalibrationChanged {
                min_distance,
                max_distance,
            } => {
                self.calibration = CalibrationRange {
                    min_distance,
                    max_distance,
                }
            }
            ControlEvent::HandDetected => self.hand_present = true,
            ControlEvent::HandLost => self.hand_present = false,
            ControlEvent::StreamEnded => {
                self.hand_present = false;
                self.streaming = false;
            }
        }
    }
}

impl DaemonStatus {
    /// Copy the latest per-frame values into the snapshot
    pub fn apply_frame(&mut self, snapshot: &FrameSnapshot) {
        self.display_percent = snapshot.display_percent;
        self.pinch_distance = snapshot.pinch_distance;
    }
}

impl Default for DaemonStatus {
    fn default() -> Self {
        Self::new(CalibrationRange::default())
    }
}
