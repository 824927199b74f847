//! Events module for control pipeline output
//!
//! Provides structured event types for volume changes, mute toggles,
//! calibration updates and frame stream lifecycle.

use serde::{Deserialize, Serialize};

/// Events emitted by the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlEvent {
    /// A new smoothed volume was sent to the audio sink
    VolumeChanged {
        /// Volume percent (0-100)
        percent: u8,
    },

    /// A held fist toggled mute
    MuteToggled {
        /// Mute state after the toggle
        muted: bool,
    },

    /// The operator changed the calibration range
    CalibrationChanged {
        min_distance: f64,
        max_distance: f64,
    },

    /// A trackable hand entered the frame
    HandDetected,

    /// A tracked hand left the frame
    HandLost,

    /// The landmark frame stream ended
    StreamEnded,
}

impl std::fmt::Display for ControlEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlEvent::VolumeChanged { percent } => write!(f, "VOLUME_CHANGED ({}%)", percent),
            ControlEvent::MuteToggled { muted } => write!(f, "MUTE_TOGGLED ({})", muted),
            ControlEvent::CalibrationChanged {
                min_distance,
                max_distance,
            } => write!(f, "CALIBRATION_CHANGED ({}..{})", min_distance, max_distance),
            ControlEvent::HandDetected => write!(f, "HAND_DETECTED"),
            ControlEvent::HandLost => write!(f, "HAND_LOST"),
            ControlEvent::StreamEnded => write!(f, "STREAM_ENDED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = ControlEvent::VolumeChanged { percent: 42 };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("volume_changed"));
        assert!(json.contains("42"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"mute_toggled","muted":true}"#;
        let event: ControlEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, ControlEvent::MuteToggled { muted: true });
    }

    #[test]
    fn test_event_display() {
        assert_eq!(ControlEvent::HandLost.to_string(), "HAND_LOST");
        assert_eq!(
            ControlEvent::MuteToggled { muted: false }.to_string(),
            "MUTE_TOGGLED (false)"
        );
    }
}
