//! Per-frame control loop
//!
//! Owns every piece of mutable pipeline state: calibration range, percent
//! history, and mute debounce timers. Each landmark frame drives both the
//! volume pipeline and the mute pipeline; operator commands adjust the
//! calibration between frames.

use std::time::Instant;

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use crate::audio::AudioSink;
use crate::config::Config;
use crate::events::ControlEvent;
use crate::gesture::{fingers_up, CalibrationRange, DistanceCalibrator, Smoother};
use crate::hand::HandState;

use super::debouncer::MuteDebouncer;

/// Commands issued by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    /// Use the current pinch distance as the 0% bound
    SetMinFromCurrentDistance,
    /// Use the current pinch distance as the 100% bound
    SetMaxFromCurrentDistance,
    /// Restore the default calibration range
    ResetCalibration,
    /// Stop the control loop
    Quit,
}

/// What the operator should see after the latest frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameSnapshot {
    /// This frame's smoothed percent, or the history mean when no hand was tracked
    pub display_percent: u8,
    /// Pinch distance of this frame, if it had a trackable hand
    pub pinch_distance: Option<f64>,
}

/// Outcome of processing one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    /// Value to show the operator: this frame's smoothed percent, or the
    /// history mean when no hand was tracked
    pub display_percent: u8,
    /// Volume sent to the sink this frame
    pub volume: Option<u8>,
    /// Mute state sent to the sink this frame
    pub mute: Option<bool>,
}

/// The gesture-to-audio controller
pub struct Controller<S: AudioSink> {
    calibrator: DistanceCalibrator,
    smoother: Smoother,
    debouncer: MuteDebouncer,
    sink: S,
    /// Pinch distance of the most recent frame, if it had a trackable hand
    last_pinch: Option<f64>,
    event_tx: broadcast::Sender<ControlEvent>,
    snapshot_tx: watch::Sender<FrameSnapshot>,
}

impl<S: AudioSink> Controller<S> {
    /// Create a controller from configuration
    pub fn new(config: &Config, sink: S, event_tx: broadcast::Sender<ControlEvent>) -> Self {
        let calibrator = DistanceCalibrator::new(CalibrationRange {
            min_distance: config.default_min_distance,
            max_distance: config.default_max_distance,
        });
        let debouncer = MuteDebouncer::new(config.hold_threshold)
            .with_absent_policy(config.absent_hand_policy)
            .with_require_release(config.require_release);

        let (snapshot_tx, _) = watch::channel(FrameSnapshot::default());

        Self {
            calibrator,
            smoother: Smoother::new(config.smoothing_window, config.change_threshold),
            debouncer,
            sink,
            last_pinch: None,
            event_tx,
            snapshot_tx,
        }
    }

    /// Follow the per-frame display value and pinch distance
    pub fn subscribe_snapshot(&self) -> watch::Receiver<FrameSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn is_muted(&self) -> bool {
        self.debouncer.is_muted()
    }

    pub fn calibration(&self) -> CalibrationRange {
        self.calibrator.range()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run until the frame stream ends or the operator quits
    pub async fn run(
        &mut self,
        mut frame_rx: mpsc::Receiver<HandState>,
        mut command_rx: mpsc::Receiver<OperatorCommand>,
    ) {
        info!("controller started");
        let mut commands_open = true;

        loop {
            tokio::select! {
                frame = frame_rx.recv() => match frame {
                    Some(hand) => {
                        self.process_frame(&hand, Instant::now());
                    }
                    None => {
                        info!("landmark stream ended");
                        self.emit(ControlEvent::StreamEnded);
                        break;
                    }
                },

                command = command_rx.recv(), if commands_open => match command {
                    Some(command) => {
                        if !self.handle_command(command) {
                            break;
                        }
                    }
                    None => {
                        debug!("operator command channel closed");
                        commands_open = false;
                    }
                },
            }
        }

        info!("controller stopped");
    }

    /// Process one landmark frame
    pub fn process_frame(&mut self, hand: &HandState, now: Instant) -> FrameReport {
        let report = self.step(hand, now);
        self.snapshot_tx.send_replace(FrameSnapshot {
            display_percent: report.display_percent,
            pinch_distance: self.last_pinch,
        });
        report
    }

    fn step(&mut self, hand: &HandState, now: Instant) -> FrameReport {
        let Some((hand, distance)) = hand.trackable() else {
            if self.last_pinch.take().is_some() {
                debug!(hold = %self.debouncer.state(), "hand lost");
                self.emit(ControlEvent::HandLost);
            }
            self.debouncer.observe_absent(now);
            return FrameReport {
                display_percent: self.smoother.smoothed_value(),
                ..FrameReport::default()
            };
        };

        if self.last_pinch.replace(distance).is_none() {
            debug!("hand detected");
            self.emit(ControlEvent::HandDetected);
        }

        let mut report = FrameReport::default();

        // Volume pipeline
        let percent = self.calibrator.distance_to_percent(distance);
        self.smoother.push(percent);
        let smoothed = self.smoother.smoothed_value();
        report.display_percent = smoothed;

        if !self.debouncer.is_muted() && self.smoother.change_gate(smoothed) {
            self.apply_volume(smoothed);
            report.volume = Some(smoothed);
        }

        // Mute pipeline
        let fingers = fingers_up(hand);
        if let Some(muted) = self.debouncer.observe(fingers, now) {
            self.apply_mute(muted);
            report.mute = Some(muted);
        }

        report
    }

    /// Apply an operator command; returns false when the loop should stop
    pub fn handle_command(&mut self, command: OperatorCommand) -> bool {
        match command {
            OperatorCommand::SetMinFromCurrentDistance => {
                self.calibrate_with(command, DistanceCalibrator::set_min_from_measurement)
            }
            OperatorCommand::SetMaxFromCurrentDistance => {
                self.calibrate_with(command, DistanceCalibrator::set_max_from_measurement)
            }
            OperatorCommand::ResetCalibration => {
                self.calibrator.reset();
                info!("calibration reset to defaults");
                self.emit_calibration();
            }
            OperatorCommand::Quit => {
                info!("quit requested");
                return false;
            }
        }
        true
    }

    fn calibrate_with(
        &mut self,
        command: OperatorCommand,
        set: fn(&mut DistanceCalibrator, f64),
    ) {
        let Some(distance) = self.last_pinch else {
            warn!(?command, "no hand in view, calibration command ignored");
            return;
        };

        set(&mut self.calibrator, distance.trunc());
        let range = self.calibrator.range();
        if range.min_distance >= range.max_distance {
            warn!(
                min_distance = range.min_distance,
                max_distance = range.max_distance,
                "calibration range is empty or inverted"
            );
        }
        info!(
            ?command,
            min_distance = range.min_distance,
            max_distance = range.max_distance,
            "calibrated"
        );
        self.emit_calibration();
    }

    fn apply_volume(&mut self, percent: u8) {
        debug!(percent, "setting volume");
        if let Err(e) = self.sink.set_volume_percent(percent) {
            warn!(%e, percent, "failed to set volume");
        }
        self.emit(ControlEvent::VolumeChanged { percent });
    }

    fn apply_mute(&mut self, muted: bool) {
        if let Err(e) = self.sink.set_mute(muted) {
            warn!(%e, muted, "failed to set mute");
        }
        self.emit(ControlEvent::MuteToggled { muted });
    }

    fn emit_calibration(&self) {
        let range = self.calibrator.range();
        self.emit(ControlEvent::CalibrationChanged {
            min_distance: range.min_distance,
            max_distance: range.max_distance,
        });
    }

    fn emit(&self, event: ControlEvent) {
        // No subscribers is normal when no IPC client is connected
        let _ = self.event_tx.send(event);
    }
}
